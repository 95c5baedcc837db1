// src/engine/session.rs

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use crate::{
    engine::{grader, randomizer::shuffle_questions},
    error::{SessionError, SubmissionError},
    models::{
        exam::{Exam, ExamType, PublicQuestion, TestCase},
        report::{ExamResult, Learner, Report},
    },
};

/// Question index (session order) to selected option key.
pub type AnswerMap = BTreeMap<usize, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Instructions,
    Questions,
    Result,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Instructions => "instructions",
            View::Questions => "questions",
            View::Result => "result",
        }
    }
}

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    Idle,
    InFlight(SubmitTrigger),
    Submitted,
}

/// One learner's attempt at one exam.
///
/// Holds no clock and does no I/O: the session actor feeds it learner
/// commands and timer events one at a time.
#[derive(Debug)]
pub struct ExamSession {
    exam: Exam,
    learner: Learner,
    view: View,
    cursor: usize,
    answers: AnswerMap,
    runs: BTreeMap<usize, Vec<bool>>,
    remaining: u64,
    time_up: bool,
    submission: SubmissionState,
    result: Option<ExamResult>,
    report: Option<Report>,
}

impl ExamSession {
    /// Shuffles the exam's questions once; the order is fixed from here on.
    pub fn new<R: Rng + ?Sized>(mut exam: Exam, learner: Learner, rng: &mut R) -> Self {
        exam.questions = shuffle_questions(std::mem::take(&mut exam.questions), rng);
        let remaining = exam.duration;
        Self {
            exam,
            learner,
            view: View::Instructions,
            cursor: 0,
            answers: AnswerMap::new(),
            runs: BTreeMap::new(),
            remaining,
            time_up: false,
            submission: SubmissionState::Idle,
            result: None,
            report: None,
        }
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_time_up(&self) -> bool {
        self.time_up
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    fn question_count(&self) -> usize {
        self.exam.questions.len()
    }

    fn is_last_question(&self) -> bool {
        self.question_count() == 0 || self.cursor + 1 == self.question_count()
    }

    fn require_questions(&self) -> Result<(), SessionError> {
        if self.view != View::Questions {
            return Err(SessionError::InvalidState(self.view.as_str()));
        }
        Ok(())
    }

    fn require_editable(&self) -> Result<(), SessionError> {
        if self.time_up {
            return Err(SessionError::TimeUp);
        }
        self.require_questions()?;
        if matches!(self.submission, SubmissionState::InFlight(_)) {
            return Err(SessionError::SubmissionInFlight);
        }
        Ok(())
    }

    /// `instructions -> questions`. Returns the duration the timer must run.
    pub fn begin(&mut self) -> Result<u64, SessionError> {
        if self.view != View::Instructions {
            return Err(SessionError::InvalidState(self.view.as_str()));
        }
        self.view = View::Questions;
        self.cursor = 0;
        Ok(self.exam.duration)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.require_questions()?;
        if self.cursor + 1 < self.question_count() {
            self.cursor += 1;
        }
        Ok(self.cursor)
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.require_questions()?;
        self.cursor = self.cursor.saturating_sub(1);
        Ok(self.cursor)
    }

    /// Records the learner's choice for the current question. Never moves the cursor.
    pub fn select_option(&mut self, option: &str) -> Result<(), SessionError> {
        self.require_editable()?;
        if self.exam.exam_type != ExamType::Quiz {
            return Err(SessionError::NotQuizExam);
        }

        let question = self
            .exam
            .questions
            .get(self.cursor)
            .ok_or(SessionError::InvalidState("an empty exam"))?;
        let known = question.options().is_some_and(|options| options.contains_key(option));
        if !known {
            return Err(SessionError::UnknownOption(option.to_string()));
        }

        self.answers.insert(self.cursor, option.to_string());
        Ok(())
    }

    /// Question index and test cases the learner's code must be run against.
    pub fn current_test_cases(&self) -> Result<(usize, Vec<TestCase>), SessionError> {
        self.require_editable()?;
        if self.exam.exam_type != ExamType::Coding {
            return Err(SessionError::NotCodingExam);
        }
        let question = self
            .exam
            .questions
            .get(self.cursor)
            .ok_or(SessionError::InvalidState("an empty exam"))?;
        Ok((self.cursor, question.test_cases().to_vec()))
    }

    /// Stores the outcome of running the learner's code; the latest run wins.
    pub fn record_run(&mut self, index: usize, outcomes: Vec<bool>) -> Result<(), SessionError> {
        self.require_editable()?;
        debug_assert!(index < self.question_count(), "run recorded for unknown question {index}");
        self.runs.insert(index, outcomes);
        Ok(())
    }

    pub fn on_tick(&mut self, remaining: u64) {
        self.remaining = remaining;
    }

    pub fn on_expired(&mut self) {
        self.remaining = 0;
        self.time_up = true;
    }

    /// Checks the one-shot submission guard without changing anything.
    pub fn ensure_can_submit(&self, trigger: SubmitTrigger) -> Result<(), SessionError> {
        match self.submission {
            SubmissionState::InFlight(_) => return Err(SessionError::SubmissionInFlight),
            SubmissionState::Submitted => return Err(SessionError::AlreadySubmitted),
            SubmissionState::Idle => {}
        }
        self.require_questions()?;
        if trigger == SubmitTrigger::Manual && !self.is_last_question() {
            return Err(SessionError::NotOnLastQuestion);
        }
        Ok(())
    }

    /// Grades the current answers and marks the submission as in flight.
    pub fn prepare_submission(&mut self, trigger: SubmitTrigger) -> Result<ExamResult, SessionError> {
        self.ensure_can_submit(trigger)?;

        let questions = &self.exam.questions;
        let result = match self.exam.exam_type {
            ExamType::Quiz => grader::grade_quiz(questions, &self.answers, self.exam.passing_marks),
            ExamType::Coding => {
                grader::grade_coding(questions, &grader::collect_outcomes(questions, &self.runs))
            }
        };

        self.submission = SubmissionState::InFlight(trigger);
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Applies the persistence outcome. Only success moves the view to `result`.
    pub fn finish_submission(
        &mut self,
        outcome: Result<Report, SubmissionError>,
    ) -> Result<Report, SessionError> {
        debug_assert!(
            matches!(self.submission, SubmissionState::InFlight(_)),
            "submission finished while none was in flight"
        );

        match outcome {
            Ok(report) => {
                self.submission = SubmissionState::Submitted;
                self.view = View::Result;
                self.report = Some(report.clone());
                Ok(report)
            }
            Err(err) => {
                self.submission = SubmissionState::Idle;
                self.result = None;
                Err(SessionError::Submission(err))
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current_question = match self.view {
            View::Questions => self.exam.questions.get(self.cursor).map(|q| q.to_public()),
            _ => None,
        };

        SessionSnapshot {
            exam_id: self.exam.id,
            exam_name: self.exam.name.clone(),
            exam_type: self.exam.exam_type,
            view: self.view,
            question_index: self.cursor,
            question_count: self.question_count(),
            current_question,
            answers: self.answers.clone(),
            remaining_seconds: self.remaining,
            time_up: self.time_up,
            submission: self.submission,
            result: match self.view {
                View::Result => self.result.clone(),
                _ => None,
            },
            report_id: self.report.as_ref().map(|r| r.id),
        }
    }
}

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub exam_id: i64,
    pub exam_name: String,
    pub exam_type: ExamType,
    pub view: View,
    pub question_index: usize,
    pub question_count: usize,
    pub current_question: Option<PublicQuestion>,
    pub answers: AnswerMap,
    pub remaining_seconds: u64,
    pub time_up: bool,
    pub submission: SubmissionState,
    pub result: Option<ExamResult>,
    pub report_id: Option<i64>,
}
