// src/models/exam.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Kind of exam: every question of an exam shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Quiz,
    Coding,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Quiz => "quiz",
            ExamType::Coding => "coding",
        }
    }
}

/// One input/expected-output pair of a coding problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[validate(length(max = 10000))]
    pub input: String,
    #[validate(length(max = 10000))]
    pub expected_output: String,
}

/// Variant-specific part of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuestionKind {
    /// Option key (e.g. "A") to option text, plus the key of the right answer.
    /// A missing `correct_option` is malformed data; the grader marks it wrong.
    Quiz {
        options: BTreeMap<String, String>,
        #[serde(rename = "correctOption", default)]
        correct_option: Option<String>,
    },
    Coding {
        #[serde(rename = "testCases", default)]
        test_cases: Vec<TestCase>,
    },
}

/// A single exam question.
///
/// Stored as one element of the exam's `questions` JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The prompt shown to the learner.
    pub name: String,

    pub marks: u32,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn options(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            QuestionKind::Quiz { options, .. } => Some(options),
            QuestionKind::Coding { .. } => None,
        }
    }

    pub fn test_cases(&self) -> &[TestCase] {
        match &self.kind {
            QuestionKind::Coding { test_cases } => test_cases,
            QuestionKind::Quiz { .. } => &[],
        }
    }

    /// Copy safe to hand to a learner while the exam is running.
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            name: self.name.clone(),
            marks: self.marks,
            options: self.options().cloned(),
            test_cases: match &self.kind {
                QuestionKind::Coding { test_cases } => Some(test_cases.clone()),
                QuestionKind::Quiz { .. } => None,
            },
        }
    }
}

/// Represents the 'exams' table. Questions are kept as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub exam_type: ExamType,
    pub questions: Vec<Question>,

    /// Time allowed, in seconds.
    pub duration: u64,

    pub passing_marks: u32,
    pub total_marks: u32,
}

impl Exam {
    pub fn summary(&self) -> ExamSummary {
        ExamSummary {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            exam_type: self.exam_type,
            question_count: self.questions.len(),
            duration: self.duration,
            passing_marks: self.passing_marks,
            total_marks: self.total_marks,
            attempted: false,
        }
    }

    /// Exam without answer keys.
    pub fn to_public(&self) -> PublicExam {
        PublicExam {
            summary: self.summary(),
            questions: self.questions.iter().map(Question::to_public).collect(),
        }
    }
}

/// DTO for sending a question to the client (excludes the correct option).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub name: String,
    pub marks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_cases: Option<Vec<TestCase>>,
}

/// Exam listing row. `attempted` is filled in per learner by the listing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub exam_type: ExamType,
    pub question_count: usize,
    pub duration: u64,
    pub passing_marks: u32,
    pub total_marks: u32,
    pub attempted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicExam {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for a question inside `CreateExamRequest`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub name: String,
    #[validate(range(max = 10000))]
    pub marks: u32,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[validate(length(min = 1, max = 20))]
    pub correct_option: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// DTO for creating a new exam.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub exam_type: ExamType,
    #[validate(range(max = 86400))]
    pub duration: u64,
    #[validate(range(max = 10000))]
    pub passing_marks: u32,
    #[validate(length(max = 500))]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn validate_options(options: &BTreeMap<String, String>) -> Result<(), validator::ValidationError> {
    for (key, text) in options {
        if key.is_empty() || key.len() > 20 {
            return Err(validator::ValidationError::new("invalid_option_key"));
        }
        if text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// New exam ready to be stored; `id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub name: String,
    pub category: String,
    pub exam_type: ExamType,
    pub questions: Vec<Question>,
    pub duration: u64,
    pub passing_marks: u32,
    pub total_marks: u32,
}

impl NewExam {
    pub fn into_exam(self, id: i64) -> Exam {
        Exam {
            id,
            name: self.name,
            category: self.category,
            exam_type: self.exam_type,
            questions: self.questions,
            duration: self.duration,
            passing_marks: self.passing_marks,
            total_marks: self.total_marks,
        }
    }
}
