// tests/api_tests.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use exam_portal::{
    config::Config,
    error::ExecutionError,
    models::exam::TestCase,
    routes,
    runner::TestRunner,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Sandbox stand-in: code containing "solve" passes every case, anything else fails the last one.
struct StubRunner;

#[async_trait]
impl TestRunner for StubRunner {
    async fn run_test_cases(
        &self,
        source_code: &str,
        test_cases: &[TestCase],
    ) -> Result<Vec<bool>, ExecutionError> {
        let mut results = vec![true; test_cases.len()];
        if !source_code.contains("solve") {
            if let Some(last) = results.last_mut() {
                *last = false;
            }
        }
        Ok(results)
    }
}

struct TestApp {
    address: String,
    client: reqwest::Client,
    admin_token: String,
    learner_token: String,
}

/// Helper function to spawn the app on a random port for testing.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        sandbox_url: None,
        tick_period: Duration::from_millis(20),
        session_idle_timeout: Duration::from_secs(600),
    };

    let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(StubRunner));
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        admin_token: sign_jwt(1, "admin", "admin", SECRET, 600).unwrap(),
        learner_token: sign_jwt(2, "learner", "user", SECRET, 600).unwrap(),
    }
}

impl TestApp {
    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn create_quiz(&self, duration: u64) -> i64 {
        let response = self
            .post(
                "/api/admin/exams",
                &self.admin_token,
                json!({
                    "name": "Ownership basics",
                    "category": "rust",
                    "examType": "quiz",
                    "duration": duration,
                    "passingMarks": 1,
                    "questions": [
                        {
                            "name": "Which type is Copy?",
                            "marks": 1,
                            "options": {"A": "i32", "B": "String"},
                            "correctOption": "A"
                        },
                        {
                            "name": "Which type owns heap data?",
                            "marks": 1,
                            "options": {"A": "u8", "B": "Vec<u8>"},
                            "correctOption": "B"
                        }
                    ]
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    async fn open_session(&self, exam_id: i64) -> String {
        let response = self
            .post("/api/sessions", &self.learner_token, json!({"examId": exam_id}))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["view"], "instructions");
        body["sessionId"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/exams", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn learners_cannot_create_exams() {
    let app = spawn_app().await;

    let response = app
        .post("/api/admin/exams", &app.learner_token, json!({}))
        .await;

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn exam_creation_is_validated() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/admin/exams",
            &app.admin_token,
            json!({
                "name": "Broken",
                "category": "rust",
                "examType": "quiz",
                "duration": 60,
                "passingMarks": 1,
                "questions": [
                    {"name": "No key", "marks": 1, "options": {"A": "x"}, "correctOption": "C"}
                ]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn published_exam_hides_answer_keys() {
    let app = spawn_app().await;
    let exam_id = app.create_quiz(60).await;

    let exam: Value = app
        .get(&format!("/api/exams/{}", exam_id), &app.learner_token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(exam["totalMarks"], 2);
    assert_eq!(exam["questions"].as_array().unwrap().len(), 2);
    assert!(exam["questions"][0].get("correctOption").is_none());
}

#[tokio::test]
async fn quiz_flow_produces_one_report() {
    let app = spawn_app().await;
    let exam_id = app.create_quiz(600).await;
    let session = app.open_session(exam_id).await;
    let base = format!("/api/sessions/{}", session);
    let token = app.learner_token.clone();

    let started: Value = app.post(&format!("{}/start", base), &token, json!({})).await.json().await.unwrap();
    assert_eq!(started["view"], "questions");
    assert_eq!(started["questionIndex"], 0);

    // Submitting away from the last question is refused.
    let early = app.post(&format!("{}/submit", base), &token, json!({})).await;
    assert_eq!(early.status().as_u16(), 409);

    // Answer both questions correctly, whatever order they were shuffled into.
    let mut current = started;
    for _ in 0..2 {
        let correct = if current["currentQuestion"]["name"] == "Which type is Copy?" { "A" } else { "B" };
        let answered = app
            .post(&format!("{}/answer", base), &token, json!({"option": correct}))
            .await;
        assert_eq!(answered.status().as_u16(), 200);
        current = app.post(&format!("{}/next", base), &token, json!({})).await.json().await.unwrap();
    }
    assert_eq!(current["questionIndex"], 1);

    let submitted = app.post(&format!("{}/submit", base), &token, json!({})).await;
    assert_eq!(submitted.status().as_u16(), 200);
    let body: Value = submitted.json().await.unwrap();
    assert_eq!(body["data"]["result"]["verdict"], "Pass");
    assert_eq!(body["data"]["result"]["totalMarks"], 2);

    let again = app.post(&format!("{}/submit", base), &token, json!({})).await;
    assert_eq!(again.status().as_u16(), 409);

    let snapshot: Value = app.get(&base, &token).await.json().await.unwrap();
    assert_eq!(snapshot["view"], "result");

    let mine: Vec<Value> = app.get("/api/reports/mine", &token).await.json().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["exam"]["name"], "Ownership basics");

    let exams: Vec<Value> = app.get("/api/exams", &token).await.json().await.unwrap();
    assert_eq!(exams[0]["attempted"], true);

    let admin_view: Vec<Value> = app
        .get("/api/admin/reports?exam_name=Ownership%20basics", &app.admin_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(admin_view.len(), 1);
    assert_eq!(admin_view[0]["learner"]["name"], "learner");
}

#[tokio::test]
async fn expired_session_is_submitted_automatically() {
    let app = spawn_app().await;
    // 2 countdown seconds of 20ms each.
    let exam_id = app.create_quiz(2).await;
    let session = app.open_session(exam_id).await;
    let base = format!("/api/sessions/{}", session);
    let token = app.learner_token.clone();

    app.post(&format!("{}/start", base), &token, json!({})).await;

    let mut snapshot = Value::Null;
    for _ in 0..100 {
        snapshot = app.get(&base, &token).await.json().await.unwrap();
        if snapshot["view"] == "result" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(snapshot["view"], "result");
    assert_eq!(snapshot["timeUp"], true);
    assert_eq!(snapshot["result"]["verdict"], "Fail");

    let mine: Vec<Value> = app.get("/api/reports/mine", &token).await.json().await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn coding_flow_uses_sandbox_results() {
    let app = spawn_app().await;
    let created: Value = app
        .post(
            "/api/admin/exams",
            &app.admin_token,
            json!({
                "name": "Sum two numbers",
                "category": "algorithms",
                "examType": "coding",
                "duration": 600,
                "passingMarks": 1,
                "questions": [{
                    "name": "Print a + b",
                    "marks": 10,
                    "testCases": [
                        {"input": "1 2", "expectedOutput": "3"},
                        {"input": "5 5", "expectedOutput": "10"},
                        {"input": "0 0", "expectedOutput": "0"}
                    ]
                }]
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let session = app.open_session(created["id"].as_i64().unwrap()).await;
    let base = format!("/api/sessions/{}", session);
    let token = app.learner_token.clone();

    app.post(&format!("{}/start", base), &token, json!({})).await;

    let quiz_answer = app.post(&format!("{}/answer", base), &token, json!({"option": "A"})).await;
    assert_eq!(quiz_answer.status().as_u16(), 400);

    let ran = app
        .post(&format!("{}/run", base), &token, json!({"sourceCode": "fn main() {}"}))
        .await;
    assert_eq!(ran.status().as_u16(), 200);
    let ran = app
        .post(&format!("{}/run", base), &token, json!({"sourceCode": "fn solve() {}"}))
        .await;
    assert_eq!(ran.status().as_u16(), 200);

    let body: Value = app.post(&format!("{}/submit", base), &token, json!({})).await.json().await.unwrap();
    assert_eq!(body["data"]["result"]["verdict"], "Pass");
    assert_eq!(body["data"]["result"]["correctAnswers"], 1);
    assert_eq!(body["data"]["result"]["totalMarks"], 10);
}

#[tokio::test]
async fn sessions_are_private_and_can_be_abandoned() {
    let app = spawn_app().await;
    let exam_id = app.create_quiz(600).await;
    let session = app.open_session(exam_id).await;
    let base = format!("/api/sessions/{}", session);

    let other = sign_jwt(3, "someone", "user", SECRET, 600).unwrap();
    assert_eq!(app.get(&base, &other).await.status().as_u16(), 404);

    let deleted = app
        .client
        .delete(format!("{}{}", app.address, base))
        .bearer_auth(&app.learner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
    assert_eq!(app.get(&base, &app.learner_token).await.status().as_u16(), 404);
}

#[tokio::test]
async fn opening_unknown_exam_is_not_found() {
    let app = spawn_app().await;

    let response = app
        .post("/api/sessions", &app.learner_token, json!({"examId": 999}))
        .await;

    assert_eq!(response.status().as_u16(), 404);
}
