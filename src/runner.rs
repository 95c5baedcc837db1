// src/runner.rs

//! Client side of the code execution sandbox.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::ExecutionError, models::exam::TestCase};

/// Runs learner code against test cases; one pass/fail flag per case, in order.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_test_cases(
        &self,
        source_code: &str,
        test_cases: &[TestCase],
    ) -> Result<Vec<bool>, ExecutionError>;
}

/// Used when no sandbox is configured.
pub struct UnavailableRunner;

#[async_trait]
impl TestRunner for UnavailableRunner {
    async fn run_test_cases(&self, _: &str, _: &[TestCase]) -> Result<Vec<bool>, ExecutionError> {
        Err(ExecutionError::Unavailable)
    }
}

const RUN_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest<'a> {
    source_code: &'a str,
    test_cases: &'a [TestCase],
}

#[derive(Deserialize)]
struct RunResponse {
    results: Vec<bool>,
}

/// Sandbox reached over HTTP: `POST {base}/run` with the code and test cases,
/// answered by `{"results": [true, false, ...]}`.
pub struct HttpTestRunner {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpTestRunner {
    pub fn new(base_url: &Url) -> Result<Self, ExecutionError> {
        let endpoint = base_url
            .join("run")
            .map_err(|e| ExecutionError::Request(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(RUN_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl TestRunner for HttpTestRunner {
    #[tracing::instrument(skip_all, fields(cases = test_cases.len()))]
    async fn run_test_cases(
        &self,
        source_code: &str,
        test_cases: &[TestCase],
    ) -> Result<Vec<bool>, ExecutionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RunRequest { source_code, test_cases })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!("Sandbox request failed: {}", e);
                ExecutionError::Request(e.to_string())
            })?;

        let body: RunResponse = response
            .json()
            .await
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        if body.results.len() != test_cases.len() {
            return Err(ExecutionError::OutcomeCount {
                expected: test_cases.len(),
                got: body.results.len(),
            });
        }
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cases(n: usize) -> Vec<TestCase> {
        (0..n)
            .map(|i| TestCase { input: i.to_string(), expected_output: (i * 2).to_string() })
            .collect()
    }

    async fn runner_for(server: &MockServer) -> HttpTestRunner {
        HttpTestRunner::new(&Url::parse(&server.uri()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_runner_errors() {
        let err = UnavailableRunner.run_test_cases("fn main() {}", &[]).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unavailable));
    }

    #[test]
    fn test_endpoint_is_joined_to_base() {
        let base = Url::parse("http://sandbox.local:8080/api/").unwrap();
        let runner = HttpTestRunner::new(&base).unwrap();
        assert_eq!(runner.endpoint.as_str(), "http://sandbox.local:8080/api/run");
    }

    #[tokio::test]
    async fn test_sandbox_results_are_returned_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_json(serde_json::json!({
                "sourceCode": "fn main() {}",
                "testCases": [
                    {"input": "0", "expectedOutput": "0"},
                    {"input": "1", "expectedOutput": "2"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [true, false]})),
            )
            .mount(&server)
            .await;

        let runner = runner_for(&server).await;
        let results = runner.run_test_cases("fn main() {}", &cases(2)).await.unwrap();
        assert_eq!(results, vec![true, false]);
    }

    #[tokio::test]
    async fn test_sandbox_error_status_is_request_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("compiler crashed"))
            .mount(&server)
            .await;

        let runner = runner_for(&server).await;
        let err = runner.run_test_cases("fn main() {}", &cases(1)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Request(_)));
    }

    #[tokio::test]
    async fn test_sandbox_wrong_result_count_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [true]})),
            )
            .mount(&server)
            .await;

        let runner = runner_for(&server).await;
        let err = runner.run_test_cases("fn main() {}", &cases(3)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::OutcomeCount { expected: 3, got: 1 }));
    }
}
