// src/handlers/exam.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{
        CreateExamRequest, CreateQuestionRequest, ExamSummary, ExamType, NewExam, Question,
        QuestionKind,
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

/// Lists all exams.
///
/// Each entry carries `attempted` for the caller. Attempting an exam again is
/// still allowed; the flag is informational.
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let learner = claims.learner()?;
    let exams = state.store.list_exams().await?;
    let attempted: HashSet<i64> = state
        .store
        .list_reports()
        .await?
        .into_iter()
        .filter(|entry| entry.report.learner.id == learner.id)
        .map(|entry| entry.report.exam_id)
        .collect();

    let summaries: Vec<ExamSummary> = exams
        .iter()
        .map(|exam| ExamSummary {
            attempted: attempted.contains(&exam.id),
            ..exam.summary()
        })
        .collect();

    Ok(Json(summaries))
}

/// Returns one exam without its answer keys.
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = state.store.fetch_exam(id).await?;
    Ok(Json(exam.to_public()))
}

fn build_question(
    index: usize,
    exam_type: ExamType,
    req: CreateQuestionRequest,
) -> Result<Question, AppError> {
    let kind = match exam_type {
        ExamType::Quiz => {
            if req.options.is_empty() {
                return Err(AppError::BadRequest(format!("Question {} has no options", index + 1)));
            }
            let correct = req.correct_option.ok_or_else(|| {
                AppError::BadRequest(format!("Question {} has no correct option", index + 1))
            })?;
            if !req.options.contains_key(&correct) {
                return Err(AppError::BadRequest(format!(
                    "Question {}: correct option '{}' is not one of its options",
                    index + 1,
                    correct
                )));
            }
            // Option text is kept verbatim: answers such as `Vec<u8>` are not markup.
            QuestionKind::Quiz {
                options: req.options,
                correct_option: Some(correct),
            }
        }
        ExamType::Coding => {
            if req.test_cases.is_empty() {
                return Err(AppError::BadRequest(format!("Problem {} has no test cases", index + 1)));
            }
            QuestionKind::Coding { test_cases: req.test_cases }
        }
    };

    Ok(Question {
        id: index as i64 + 1,
        name: clean_html(&req.name),
        marks: req.marks,
        kind,
    })
}

/// Creates a new exam.
/// Admin only. Total marks are the sum of the question marks.
pub async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam_type = payload.exam_type;
    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| build_question(index, exam_type, q))
        .collect::<Result<Vec<_>, _>>()?;
    let total_marks = questions
        .iter()
        .try_fold(0u32, |sum, q| sum.checked_add(q.marks))
        .ok_or_else(|| AppError::BadRequest("Total marks are out of range".to_string()))?;

    let exam = state
        .store
        .create_exam(NewExam {
            name: clean_html(&payload.name),
            category: clean_html(&payload.category),
            exam_type,
            questions,
            duration: payload.duration,
            passing_marks: payload.passing_marks,
            total_marks,
        })
        .await?;

    tracing::info!("Exam {} '{}' created", exam.id, exam.name);

    Ok((StatusCode::CREATED, Json(exam)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::TestCase;
    use std::collections::BTreeMap;

    fn quiz_request(correct: Option<&str>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            name: "<i>Which</i> trait?<script>x()</script>".to_string(),
            marks: 2,
            options: BTreeMap::from([
                ("A".to_string(), "Copy".to_string()),
                ("B".to_string(), "Clone".to_string()),
                ("C".to_string(), "Vec<u8>".to_string()),
            ]),
            correct_option: correct.map(str::to_string),
            test_cases: vec![],
        }
    }

    #[test]
    fn test_build_quiz_question_sanitizes_prompt() {
        let q = build_question(0, ExamType::Quiz, quiz_request(Some("B"))).unwrap();
        assert_eq!(q.id, 1);
        assert_eq!(q.name, "<i>Which</i> trait?");
        assert_eq!(q.marks, 2);
        assert_eq!(q.options().unwrap()["C"], "Vec<u8>");
    }

    #[test]
    fn test_build_quiz_question_rejects_bad_key() {
        assert!(build_question(0, ExamType::Quiz, quiz_request(None)).is_err());
        assert!(build_question(0, ExamType::Quiz, quiz_request(Some("Z"))).is_err());
    }

    #[test]
    fn test_build_coding_question_needs_test_cases() {
        let mut req = quiz_request(None);
        assert!(build_question(0, ExamType::Coding, req.clone()).is_err());

        req.test_cases = vec![TestCase { input: "1".to_string(), expected_output: "1".to_string() }];
        let q = build_question(3, ExamType::Coding, req).unwrap();
        assert_eq!(q.test_cases().len(), 1);
        assert_eq!(q.id, 4);
    }

    #[test]
    fn test_exam_request_rejects_oversized_marks() {
        let mut question = quiz_request(Some("A"));
        question.marks = u32::MAX;
        let req = CreateExamRequest {
            name: "Overflow".to_string(),
            category: "rust".to_string(),
            exam_type: ExamType::Quiz,
            duration: 60,
            passing_marks: 1,
            questions: vec![question.clone(), question],
        };
        assert!(req.validate().is_err());

        let mut req = req;
        for q in &mut req.questions {
            q.marks = 10000;
        }
        req.passing_marks = u32::MAX;
        assert!(req.validate().is_err());

        req.passing_marks = 1;
        assert!(req.validate().is_ok());
    }
}
