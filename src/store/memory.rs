// src/store/memory.rs

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{
        exam::{Exam, NewExam},
        report::{NewReport, Report, ReportEntry},
    },
    store::ExamStore,
};

#[derive(Default)]
struct Tables {
    exams: Vec<Exam>,
    reports: Vec<Report>,
}

/// In-process store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn fetch_exam(&self, id: i64) -> Result<Exam, StoreError> {
        self.lock()?
            .exams
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Exam {} not found", id)))
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StoreError> {
        Ok(self.lock()?.exams.clone())
    }

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, StoreError> {
        let mut tables = self.lock()?;
        let id = tables.exams.len() as i64 + 1;
        let exam = exam.into_exam(id);
        tables.exams.push(exam.clone());
        Ok(exam)
    }

    async fn save_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut tables = self.lock()?;
        if !tables.exams.iter().any(|e| e.id == report.exam_id) {
            return Err(StoreError::NotFound(format!("Exam {} not found", report.exam_id)));
        }

        let stored = Report {
            id: tables.reports.len() as i64 + 1,
            exam_id: report.exam_id,
            learner: report.learner,
            result: report.result,
            created_at: chrono::Utc::now(),
        };
        tables.reports.push(stored.clone());
        Ok(stored)
    }

    async fn list_reports(&self) -> Result<Vec<ReportEntry>, StoreError> {
        let tables = self.lock()?;
        let mut entries: Vec<ReportEntry> = tables
            .reports
            .iter()
            .filter_map(|report| {
                let exam = tables.exams.iter().find(|e| e.id == report.exam_id)?;
                Some(ReportEntry { report: report.clone(), exam: exam.summary() })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.report
                .created_at
                .cmp(&a.report.created_at)
                .then(b.report.id.cmp(&a.report.id))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        exam::ExamType,
        report::{CorrectAnswers, ExamResult, Learner, Verdict},
    };

    fn new_exam(name: &str) -> NewExam {
        NewExam {
            name: name.to_string(),
            category: "rust".to_string(),
            exam_type: ExamType::Quiz,
            questions: vec![],
            duration: 30,
            passing_marks: 0,
            total_marks: 0,
        }
    }

    fn new_report(exam_id: i64) -> NewReport {
        NewReport {
            exam_id,
            learner: Learner { id: 1, name: "ann".to_string(), is_admin: false },
            result: ExamResult {
                correct_answers: CorrectAnswers::Questions(vec![]),
                wrong_answers: vec![],
                verdict: Verdict::Pass,
                total_marks: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_exam_roundtrip_and_missing() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam("Traits")).await.unwrap();

        assert_eq!(store.fetch_exam(exam.id).await.unwrap().name, "Traits");
        assert!(matches!(store.fetch_exam(42).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reports_newest_first() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam("Traits")).await.unwrap();

        let first = store.save_report(new_report(exam.id)).await.unwrap();
        let second = store.save_report(new_report(exam.id)).await.unwrap();

        let listed = store.list_reports().await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|e| e.report.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(listed[0].exam.name, "Traits");
    }

    #[tokio::test]
    async fn test_report_for_unknown_exam_rejected() {
        let store = MemoryStore::new();
        assert!(store.save_report(new_report(7)).await.is_err());
    }
}
