// src/store/pg.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::StoreError,
    models::{
        exam::{Exam, ExamSummary, ExamType, NewExam, Question},
        report::{ExamResult, Learner, NewReport, Report, ReportEntry},
    },
    store::ExamStore,
};

/// Postgres-backed store. Questions and results are JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for reading a row of the 'exams' table.
#[derive(FromRow)]
struct ExamRow {
    id: i64,
    name: String,
    category: String,
    exam_type: String,
    duration: i64,
    passing_marks: i32,
    total_marks: i32,
    questions: Json<Vec<Question>>,
}

fn parse_exam_type(value: &str) -> Result<ExamType, StoreError> {
    match value {
        "quiz" => Ok(ExamType::Quiz),
        "coding" => Ok(ExamType::Coding),
        other => Err(StoreError::Serialization(format!("unknown exam type '{}'", other))),
    }
}

fn non_negative<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T, StoreError> {
    T::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("column {} out of range: {}", column, value)))
}

fn int_column(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("column {} out of range: {}", column, value)))
}

impl TryFrom<ExamRow> for Exam {
    type Error = StoreError;

    fn try_from(row: ExamRow) -> Result<Self, Self::Error> {
        Ok(Exam {
            id: row.id,
            name: row.name,
            category: row.category,
            exam_type: parse_exam_type(&row.exam_type)?,
            questions: row.questions.0,
            duration: non_negative(row.duration, "duration")?,
            passing_marks: non_negative(row.passing_marks.into(), "passing_marks")?,
            total_marks: non_negative(row.total_marks.into(), "total_marks")?,
        })
    }
}

/// Helper struct for a report joined with its exam.
#[derive(FromRow)]
struct ReportRow {
    id: i64,
    exam_id: i64,
    user_id: i64,
    user_name: String,
    user_is_admin: bool,
    result: Json<ExamResult>,
    created_at: chrono::DateTime<chrono::Utc>,
    exam_name: String,
    exam_category: String,
    exam_type: String,
    exam_duration: i64,
    exam_passing_marks: i32,
    exam_total_marks: i32,
    exam_question_count: i32,
}

const EXAM_COLUMNS: &str =
    "id, name, category, exam_type, duration, passing_marks, total_marks, questions";

#[async_trait]
impl ExamStore for PgStore {
    async fn fetch_exam(&self, id: i64) -> Result<Exam, StoreError> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            "SELECT {} FROM exams WHERE id = $1",
            EXAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", id, e);
            StoreError::from(e)
        })?
        .ok_or_else(|| StoreError::NotFound(format!("Exam {} not found", id)))?;

        Exam::try_from(row)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StoreError> {
        let rows = sqlx::query_as::<_, ExamRow>(&format!(
            "SELECT {} FROM exams ORDER BY id",
            EXAM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exams: {:?}", e);
            StoreError::from(e)
        })?;

        rows.into_iter().map(Exam::try_from).collect()
    }

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, StoreError> {
        let duration = i64::try_from(exam.duration)
            .map_err(|_| StoreError::Serialization("duration out of range".to_string()))?;
        let passing_marks = int_column(exam.passing_marks, "passing_marks")?;
        let total_marks = int_column(exam.total_marks, "total_marks")?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO exams (name, category, exam_type, duration, passing_marks, total_marks, questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&exam.name)
        .bind(&exam.category)
        .bind(exam.exam_type.as_str())
        .bind(duration)
        .bind(passing_marks)
        .bind(total_marks)
        .bind(Json(&exam.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(exam.into_exam(id))
    }

    async fn save_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let (id, created_at): (i64, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            r#"
            INSERT INTO reports (exam_id, user_id, user_name, user_is_admin, result)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(report.exam_id)
        .bind(report.learner.id)
        .bind(&report.learner.name)
        .bind(report.learner.is_admin)
        .bind(Json(&report.result))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert report: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(Report {
            id,
            exam_id: report.exam_id,
            learner: report.learner,
            result: report.result,
            created_at,
        })
    }

    async fn list_reports(&self) -> Result<Vec<ReportEntry>, StoreError> {
        let rows = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT
                r.id, r.exam_id, r.user_id, r.user_name, r.user_is_admin, r.result, r.created_at,
                e.name AS exam_name,
                e.category AS exam_category,
                e.exam_type,
                e.duration AS exam_duration,
                e.passing_marks AS exam_passing_marks,
                e.total_marks AS exam_total_marks,
                jsonb_array_length(e.questions) AS exam_question_count
            FROM reports r
            JOIN exams e ON e.id = r.exam_id
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reports: {:?}", e);
            StoreError::from(e)
        })?;

        rows.into_iter()
            .map(|row| {
                let exam = ExamSummary {
                    id: row.exam_id,
                    name: row.exam_name,
                    category: row.exam_category,
                    exam_type: parse_exam_type(&row.exam_type)?,
                    question_count: non_negative(row.exam_question_count.into(), "questions")?,
                    duration: non_negative(row.exam_duration, "duration")?,
                    passing_marks: non_negative(row.exam_passing_marks.into(), "passing_marks")?,
                    total_marks: non_negative(row.exam_total_marks.into(), "total_marks")?,
                    attempted: true,
                };
                Ok(ReportEntry {
                    report: Report {
                        id: row.id,
                        exam_id: row.exam_id,
                        learner: Learner {
                            id: row.user_id,
                            name: row.user_name,
                            is_admin: row.user_is_admin,
                        },
                        result: row.result.0,
                        created_at: row.created_at,
                    },
                    exam,
                })
            })
            .collect()
    }
}
