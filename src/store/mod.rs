// src/store/mod.rs

//! Persistence of exams and reports.

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{
        exam::{Exam, NewExam},
        report::{NewReport, Report, ReportEntry},
    },
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Data store backing the portal.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn fetch_exam(&self, id: i64) -> Result<Exam, StoreError>;

    async fn list_exams(&self) -> Result<Vec<Exam>, StoreError>;

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, StoreError>;

    /// Stores a report and returns it with its id and creation time.
    async fn save_report(&self, report: NewReport) -> Result<Report, StoreError>;

    /// All reports joined with their exam, newest first.
    async fn list_reports(&self) -> Result<Vec<ReportEntry>, StoreError>;
}
