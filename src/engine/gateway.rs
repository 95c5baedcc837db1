// src/engine/gateway.rs

use std::sync::Arc;

use crate::{
    error::SubmissionError,
    models::report::{ExamResult, Learner, NewReport, Report},
    store::ExamStore,
};

/// Hands graded results to the store. Failures are returned, never retried.
#[derive(Clone)]
pub struct ReportGateway {
    store: Arc<dyn ExamStore>,
}

impl ReportGateway {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    pub async fn submit(
        &self,
        exam_id: i64,
        learner: Learner,
        result: ExamResult,
    ) -> Result<Report, SubmissionError> {
        let report = self
            .store
            .save_report(NewReport { exam_id, learner, result })
            .await?;

        tracing::info!(
            "Report {} stored for exam {} (learner {}, verdict {:?})",
            report.id,
            report.exam_id,
            report.learner.id,
            report.result.verdict
        );
        Ok(report)
    }
}
