// src/engine/grader.rs

use std::collections::BTreeMap;

use crate::{
    engine::session::AnswerMap,
    models::{
        exam::{Question, QuestionKind},
        report::{CorrectAnswers, ExamResult, Verdict},
    },
};

/// Marks of the given questions, capped at `u32::MAX`.
fn sum_marks(questions: &[Question]) -> u32 {
    questions.iter().fold(0u32, |sum, q| sum.saturating_add(q.marks))
}

/// Grades a quiz attempt.
///
/// Questions are visited in session order; `answers` is keyed by that order.
/// An unanswered question, or one without a usable answer key, counts as wrong.
pub fn grade_quiz(questions: &[Question], answers: &AnswerMap, passing_marks: u32) -> ExamResult {
    let mut correct = Vec::new();
    let mut wrong = Vec::new();

    for (index, question) in questions.iter().enumerate() {
        let selected = answers.get(&index);
        let is_correct = match &question.kind {
            QuestionKind::Quiz { correct_option: Some(key), .. } => selected == Some(key),
            QuestionKind::Quiz { correct_option: None, .. } => {
                tracing::warn!("Question {} has no correct option, grading it as wrong", question.id);
                false
            }
            QuestionKind::Coding { .. } => {
                tracing::warn!("Coding question {} found in a quiz, grading it as wrong", question.id);
                false
            }
        };

        if is_correct {
            correct.push(question.clone());
        } else {
            wrong.push(question.clone());
        }
    }

    let total_marks = sum_marks(&correct);
    let verdict = Verdict::from_passed(correct.len() >= passing_marks as usize);

    ExamResult {
        correct_answers: CorrectAnswers::Questions(correct),
        wrong_answers: wrong,
        verdict,
        total_marks,
    }
}

/// Grades a coding attempt from per-test-case outcomes.
///
/// Passing requires at least one outcome and every outcome to be true.
pub fn grade_coding(questions: &[Question], outcomes: &[bool]) -> ExamResult {
    let all_passed = !outcomes.is_empty() && outcomes.iter().all(|passed| *passed);

    if all_passed {
        ExamResult {
            correct_answers: CorrectAnswers::Count(1),
            wrong_answers: Vec::new(),
            verdict: Verdict::Pass,
            total_marks: sum_marks(questions),
        }
    } else {
        ExamResult {
            correct_answers: CorrectAnswers::Count(0),
            wrong_answers: questions.to_vec(),
            verdict: Verdict::Fail,
            total_marks: 0,
        }
    }
}

/// Flattens recorded runs into one outcome sequence in session order.
/// A question that was never run fails each of its test cases.
pub fn collect_outcomes(questions: &[Question], runs: &BTreeMap<usize, Vec<bool>>) -> Vec<bool> {
    let mut outcomes = Vec::new();
    for (index, question) in questions.iter().enumerate() {
        match runs.get(&index) {
            Some(run) => outcomes.extend_from_slice(run),
            None => outcomes.extend(std::iter::repeat_n(false, question.test_cases().len())),
        }
    }
    outcomes
}
