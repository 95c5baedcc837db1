// src/models/report.rs

use serde::{Deserialize, Serialize};

use crate::models::exam::{ExamSummary, Question};

/// Pass/Fail outcome of a graded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_passed(passed: bool) -> Self {
        if passed { Verdict::Pass } else { Verdict::Fail }
    }
}

/// Quiz results list the questions answered correctly; coding results only
/// carry a 0/1 indicator of whether every test case passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswers {
    Questions(Vec<Question>),
    Count(u32),
}

impl CorrectAnswers {
    pub fn count(&self) -> usize {
        match self {
            CorrectAnswers::Questions(questions) => questions.len(),
            CorrectAnswers::Count(n) => *n as usize,
        }
    }
}

/// Graded outcome of one session, embedded in its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub correct_answers: CorrectAnswers,
    pub wrong_answers: Vec<Question>,
    pub verdict: Verdict,

    /// Marks earned.
    pub total_marks: u32,
}

/// Identity of the learner, as supplied by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Represents the 'reports' table in the database.
/// Written once per completed session and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub exam_id: i64,
    pub learner: Learner,
    pub result: ExamResult,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Report waiting to be stored.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub exam_id: i64,
    pub learner: Learner,
    pub result: ExamResult,
}

/// Listing row: a report joined with the exam it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    #[serde(flatten)]
    pub report: Report,
    pub exam: ExamSummary,
}

/// Query string of the admin report listing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportFilter {
    pub exam_name: Option<String>,
    pub user_id: Option<i64>,
}

impl ReportFilter {
    pub fn matches(&self, entry: &ReportEntry) -> bool {
        if let Some(name) = &self.exam_name {
            if &entry.exam.name != name {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if entry.report.learner.id != user_id {
                return false;
            }
        }
        true
    }
}
