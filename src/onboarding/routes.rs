//! REST endpoints for the onboarding wizard.
//!
//! Every endpoint returns the uniform envelope: `{"status":"ok", ...}` on
//! success, `{"status":"error","error":{...}}` (via the `Error` responder)
//! on failure.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{Error, FieldViolation, Result, ValidationError};

use super::manager::{OnboardingManager, UploadedFile};
use super::validate::{FounderInput, TeamMemberInput, VentureInput};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/session", post(create_session))
        .route("/api/onboarding/session/{id}", get(get_session))
        .route("/api/onboarding/founder", post(founder_step))
        .route("/api/onboarding/venture", post(venture_step))
        .route("/api/onboarding/team/add", post(team_add))
        .route("/api/onboarding/team/{session_id}", get(team_list))
        .route("/api/onboarding/team/update", post(team_update))
        .route("/api/onboarding/team/delete", post(team_delete))
        .route("/api/onboarding/team/complete", post(team_complete))
        .route("/api/onboarding/upload", post(upload))
        .route("/api/onboarding/submit-for-scoring", post(submit_for_scoring))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    session_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FounderStepRequest {
    session_id: Uuid,
    #[serde(flatten)]
    input: FounderInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VentureStepRequest {
    session_id: Uuid,
    #[serde(flatten)]
    input: VentureInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamAddRequest {
    session_id: Uuid,
    #[serde(flatten)]
    input: TeamMemberInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamUpdateRequest {
    session_id: Uuid,
    member_id: Uuid,
    #[serde(flatten)]
    input: TeamMemberInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamDeleteRequest {
    session_id: Uuid,
    member_id: Uuid,
}

async fn create_session(State(state): State<OnboardingRouteState>) -> Result<Json<Value>> {
    let session = state.manager.initialize_session().await?;
    Ok(Json(json!({
        "status": "ok",
        "sessionId": session.session_id,
        "currentStep": session.current_step,
    })))
}

async fn get_session(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let session = state.manager.get_session(id).await?;
    Ok(Json(json!({ "status": "ok", "session": session })))
}

async fn founder_step(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<FounderStepRequest>,
) -> Result<Json<Value>> {
    let outcome = state
        .manager
        .complete_founder_step(req.session_id, req.input)
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "sessionId": outcome.session_id,
        "founderId": outcome.founder_id,
        "nextStep": outcome.next_step,
    })))
}

async fn venture_step(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<VentureStepRequest>,
) -> Result<Json<Value>> {
    let outcome = state
        .manager
        .complete_venture_step(req.session_id, req.input)
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "venture": outcome.venture,
        "folderStructure": outcome.folder_structure,
        "nextStep": outcome.next_step,
    })))
}

async fn team_add(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<TeamAddRequest>,
) -> Result<Json<Value>> {
    let member = state
        .manager
        .add_team_member(req.session_id, req.input)
        .await?;
    Ok(Json(json!({ "status": "ok", "member": member })))
}

async fn team_list(
    State(state): State<OnboardingRouteState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let members = state.manager.get_team_members(session_id).await?;
    Ok(Json(json!({ "status": "ok", "members": members })))
}

async fn team_update(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<TeamUpdateRequest>,
) -> Result<Json<Value>> {
    let member = state
        .manager
        .update_team_member(req.session_id, req.member_id, req.input)
        .await?;
    Ok(Json(json!({ "status": "ok", "member": member })))
}

async fn team_delete(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<TeamDeleteRequest>,
) -> Result<Json<Value>> {
    state
        .manager
        .delete_team_member(req.session_id, req.member_id)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn team_complete(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<Value>> {
    let next_step = state.manager.complete_team_step(req.session_id).await?;
    Ok(Json(json!({ "status": "ok", "nextStep": next_step })))
}

/// Multipart upload: a `sessionId` text field plus a `file` part.
async fn upload(
    State(state): State<OnboardingRouteState>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut session_id: Option<Uuid> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid_multipart(e.to_string()))?
    {
        match field.name() {
            Some("sessionId") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| invalid_multipart(e.to_string()))?;
                session_id =
                    Some(raw.parse().map_err(|_| {
                        invalid_multipart(format!("invalid sessionId: {raw:?}"))
                    })?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| invalid_multipart(e.to_string()))?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let session_id = session_id.ok_or_else(|| invalid_multipart("missing sessionId".into()))?;
    let file = file.ok_or_else(|| invalid_multipart("missing file part".into()))?;

    let outcome = state.manager.handle_document_upload(session_id, file).await?;
    Ok(Json(json!({
        "status": "ok",
        "upload": outcome.upload,
        "nextStep": outcome.next_step,
    })))
}

async fn submit_for_scoring(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<Value>> {
    let outcome = state.manager.submit_for_scoring(req.session_id).await?;
    Ok(Json(json!({
        "status": "ok",
        "scoringResult": outcome.scoring_result,
        "isComplete": outcome.is_complete,
    })))
}

fn invalid_multipart(message: String) -> Error {
    ValidationError::new(vec![FieldViolation {
        field: "multipart",
        message,
    }])
    .into()
}
