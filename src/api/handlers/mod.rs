use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Database, DbError};
use crate::engine::{slots_for, ScheduleError};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map an error to a response.
///
/// Scheduling and storage rejections are the caller's fault and are returned
/// verbatim. Anything else is logged server-side and replaced with a generic
/// message so internal details do not leak.
fn internal_error(e: impl Into<anyhow::Error>) -> (StatusCode, String) {
    let e = e.into();

    if let Some(err) = e.downcast_ref::<ScheduleError>() {
        tracing::warn!("Schedule rejected: {}", err);
        return (StatusCode::BAD_REQUEST, err.to_string());
    }
    if let Some(err) = e.downcast_ref::<DbError>() {
        tracing::warn!("Request rejected: {}", err);
        let status = match err {
            DbError::UnknownProject(_) => StatusCode::BAD_REQUEST,
            DbError::ProjectInUse(_) => StatusCode::CONFLICT,
        };
        return (status, err.to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn get_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(db): State<Database>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    if input.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Project name is required".to_string()));
    }
    db.create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.update_project(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn delete_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

// ============================================================
// Candidates
// ============================================================

/// Query parameters for fetching candidates.
#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    /// Number of candidates wanted.
    pub count: u32,
    /// Comma-separated project UUIDs to put first.
    pub selected: Option<String>,
}

impl CandidatesQuery {
    fn into_request(self) -> Result<CandidateRequest, (StatusCode, String)> {
        let selected_ids = self
            .selected
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Uuid::parse_str(s)
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid UUID '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CandidateRequest {
            desired_count: self.count,
            selected_ids,
        })
    }
}

pub async fn list_candidates(
    State(db): State<Database>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<Candidate>>, (StatusCode, String)> {
    let request = query.into_request()?;
    db.get_candidates(&request).map(Json).map_err(internal_error)
}

// ============================================================
// Slots
// ============================================================

/// Generate the slots a configuration would produce, without saving anything.
pub async fn preview_slots(
    Json(config): Json<ScheduleConfig>,
) -> Result<Json<Vec<TimeSlot>>, (StatusCode, String)> {
    slots_for(&config).map(Json).map_err(internal_error)
}

// ============================================================
// Schedules
// ============================================================

pub async fn list_schedules(
    State(db): State<Database>,
) -> Result<Json<Vec<ScheduleSummary>>, (StatusCode, String)> {
    db.list_schedules().map(Json).map_err(internal_error)
}

pub async fn get_schedule(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleRecord>, (StatusCode, String)> {
    db.get_schedule(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Schedule not found".to_string()))
}

pub async fn create_schedule(
    State(db): State<Database>,
    Json(input): Json<SaveScheduleInput>,
) -> Result<(StatusCode, Json<ScheduleRecord>), (StatusCode, String)> {
    if input.schedule_id.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            "New schedules must not carry an id; use PUT to update".to_string(),
        ));
    }
    db.create_schedule(input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

pub async fn update_schedule(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<SaveScheduleInput>,
) -> Result<Json<ScheduleRecord>, (StatusCode, String)> {
    if input.schedule_id.is_some_and(|body_id| body_id != id) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Schedule id in body does not match path".to_string(),
        ));
    }
    db.update_schedule(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Schedule not found".to_string()))
}

pub async fn delete_schedule(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_schedule(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Schedule not found".to_string()))
    }
}
