// src/handlers/report.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::report::{ReportEntry, ReportFilter},
    state::AppState,
    utils::jwt::Claims,
};

/// Retrieves the caller's own reports, newest first.
pub async fn my_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let learner = claims.learner()?;
    let filter = ReportFilter { exam_name: None, user_id: Some(learner.id) };

    let reports: Vec<ReportEntry> = state
        .store
        .list_reports()
        .await?
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .collect();

    Ok(Json(reports))
}

/// Lists learner reports for the admin view.
/// Admin only. Reports written by admins themselves are left out.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(filter): Query<ReportFilter>,
) -> Result<impl IntoResponse, AppError> {
    let reports: Vec<ReportEntry> = state
        .store
        .list_reports()
        .await?
        .into_iter()
        .filter(|entry| !entry.report.learner.is_admin && filter.matches(entry))
        .collect();

    Ok(Json(reports))
}
