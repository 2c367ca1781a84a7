//! REST endpoints for the coach overlay and journey.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::Result;

use super::manager::{CoachAction, CoachManager};
use super::progress::ClientSignals;

#[derive(Clone)]
pub struct CoachRouteState {
    pub manager: Arc<CoachManager>,
}

pub fn coach_routes(state: CoachRouteState) -> Router {
    Router::new()
        .route(
            "/api/coach/{founder_id}",
            get(get_view).patch(apply_action),
        )
        .route("/api/coach/{founder_id}/complete-step", post(complete_step))
        .route(
            "/api/coach/{founder_id}/complete-tutorial",
            post(complete_tutorial),
        )
        .route("/api/coach/{founder_id}/reset", post(reset))
        .route("/api/coach/{founder_id}/progress", get(get_progress))
        .route("/api/coach/{founder_id}/signals", post(report_signals))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: String,
}

fn default_page() -> String {
    "dashboard".to_string()
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: CoachAction,
    #[serde(default = "default_page")]
    page: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteStepRequest {
    step_id: u32,
}

#[derive(Debug, Deserialize)]
struct CompleteTutorialRequest {
    page: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressQuery {
    venture_id: Option<Uuid>,
}

async fn get_view(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let view = state.manager.view(founder_id, &query.page).await?;
    Ok(Json(json!({ "status": "ok", "coach": view })))
}

async fn apply_action(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Value>> {
    let view = state
        .manager
        .apply_action(founder_id, req.action, &req.page)
        .await?;
    Ok(Json(json!({ "status": "ok", "coach": view })))
}

async fn complete_step(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Json(req): Json<CompleteStepRequest>,
) -> Result<Json<Value>> {
    let view = state.manager.complete_step(founder_id, req.step_id).await?;
    Ok(Json(json!({ "status": "ok", "coach": view })))
}

async fn complete_tutorial(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Json(req): Json<CompleteTutorialRequest>,
) -> Result<Json<Value>> {
    let view = state
        .manager
        .complete_tutorial(founder_id, &req.page)
        .await?;
    Ok(Json(json!({ "status": "ok", "coach": view })))
}

async fn reset(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let view = state.manager.reset(founder_id).await?;
    Ok(Json(json!({ "status": "ok", "coach": view })))
}

async fn get_progress(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<Value>> {
    let progress = state
        .manager
        .journey_progress(founder_id, query.venture_id)
        .await?;
    Ok(Json(json!({ "status": "ok", "progress": progress })))
}

async fn report_signals(
    State(state): State<CoachRouteState>,
    Path(founder_id): Path<Uuid>,
    Json(signals): Json<ClientSignals>,
) -> Result<Json<Value>> {
    state.manager.report_signals(founder_id, signals).await?;
    Ok(Json(json!({ "status": "ok" })))
}
