// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::{SessionHandle, SessionSnapshot},
    error::AppError,
    models::report::Report,
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub exam_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 20))]
    pub option: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RunCodeRequest {
    #[validate(length(min = 1, max = 65536))]
    pub source_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: Report,
}

/// Looks up a session owned by the caller. Other learners' sessions are reported as missing.
fn owned_session(state: &AppState, claims: &Claims, id: Uuid) -> Result<SessionHandle, AppError> {
    let learner = claims.learner()?;
    state
        .sessions
        .get(&id)
        .filter(|handle| handle.learner_id() == learner.id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

fn respond(id: Uuid, snapshot: SessionSnapshot) -> Json<SessionResponse> {
    Json(SessionResponse { session_id: id, snapshot })
}

/// Loads the exam and opens a session in the instructions view.
pub async fn open_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = claims.learner()?;
    let handle = SessionHandle::open(
        state.session_ctx.clone(),
        state.store.as_ref(),
        req.exam_id,
        learner,
    )
    .await?;

    let snapshot = handle.snapshot().await?;
    let id = handle.id();
    state.sessions.insert(handle);

    Ok((StatusCode::CREATED, respond(id, snapshot)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.snapshot().await?))
}

/// Leaves the instructions and starts the countdown.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.begin().await?))
}

pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.next().await?))
}

pub async fn previous_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.previous().await?))
}

pub async fn select_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.select_option(&req.option).await?))
}

/// Runs the learner's code against the current problem's test cases.
pub async fn run_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<RunCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let handle = owned_session(&state, &claims, id)?;
    Ok(respond(id, handle.run_code(&req.source_code).await?))
}

/// Manual submission from the last question.
/// On failure the session stays open and the learner may submit again.
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    let report = handle.submit().await?;

    Ok(Json(SubmitResponse {
        success: true,
        message: "Report added successfully",
        data: report,
    }))
}

/// Leaves the session. Its countdown stops and nothing is submitted.
pub async fn abandon_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&state, &claims, id)?;
    state.sessions.remove(&id);
    handle.abandon().await;

    Ok(StatusCode::NO_CONTENT)
}
