// routes/milestones.rs
// Milestone endpoints. Milestones live embedded in projects, so every
// handler resolves through the owning project.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::MilestoneStatus;
use crate::routes::{parse_date, parse_object_id, parse_optional_date};
use crate::session::SessionUser;
use crate::state::{
    AppState, NewMilestone, achieve_milestone, add_milestone, create_milestones, delete_milestone,
    list_client_milestones, milestone_stats,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub percentage: f64,
    pub amount: f64,
    pub due_date: String,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestonesRequest {
    #[serde(default)]
    pub milestones: Vec<MilestoneRequest>,
    pub project_id: String,
    pub estimate_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMilestoneRequest {
    pub client_id: String,
    #[serde(flatten)]
    pub milestone: MilestoneRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub client_id: Option<String>,
}

fn to_new_milestone(request: MilestoneRequest) -> AppResult<NewMilestone> {
    let status = match request.status.as_deref() {
        Some(raw) => Some(
            MilestoneStatus::parse(raw)
                .ok_or_else(|| AppError::validation(format!("invalid milestone status: {raw}")))?,
        ),
        None => None,
    };
    Ok(NewMilestone {
        name: request.name,
        description: request.description,
        percentage: request.percentage,
        amount: request.amount,
        due_date: parse_date(&request.due_date)?,
        status,
        notes: request.notes,
    })
}

pub async fn get_client_milestones(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(client_id): Path<String>,
) -> AppResult<Json<Value>> {
    let client_id = parse_object_id(&client_id, "client")?;
    let (milestones, summary) =
        list_client_milestones(&state, session.user_id(), &client_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": milestones,
        "summary": summary,
    })))
}

/// Bulk replacement of a project's milestones, used by the estimate-driven
/// plan generation flow.
pub async fn create_project_milestones(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(client_id): Path<String>,
    Json(body): Json<CreateMilestonesRequest>,
) -> AppResult<Response> {
    let client_id = parse_object_id(&client_id, "client")?;
    let project_id = parse_object_id(&body.project_id, "project")?;
    let estimate_id = match body.estimate_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(parse_object_id(raw, "estimate")?),
        _ => None,
    };

    let milestones = body
        .milestones
        .into_iter()
        .map(to_new_milestone)
        .collect::<AppResult<Vec<_>>>()?;

    let project = create_milestones(
        &state,
        session.user_id(),
        &client_id,
        &project_id,
        milestones,
        estimate_id,
        parse_optional_date(&body.start_date)?,
        parse_optional_date(&body.end_date)?,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "milestones created successfully",
            "data": project,
        })),
    )
        .into_response())
}

pub async fn add_project_milestone(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(project_id): Path<String>,
    Json(body): Json<AddMilestoneRequest>,
) -> AppResult<Response> {
    let project_id = parse_object_id(&project_id, "project")?;
    let client_id = parse_object_id(&body.client_id, "client")?;
    let input = to_new_milestone(body.milestone)?;

    let milestone =
        add_milestone(&state, session.user_id(), &client_id, &project_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "milestone added successfully",
            "data": milestone,
        })),
    )
        .into_response())
}

pub async fn mark_milestone_achieved(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "milestone")?;
    let milestone = achieve_milestone(&state, session.user_id(), &id).await?;
    Ok(Json(json!({ "success": true, "data": milestone })))
}

pub async fn remove_milestone(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "milestone")?;
    let milestone = delete_milestone(&state, session.user_id(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "milestone deleted successfully",
        "data": milestone,
    })))
}

pub async fn get_milestone_stats(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<Value>> {
    let client_id = match query.client_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(parse_object_id(raw, "client")?),
        _ => None,
    };
    let stats = milestone_stats(&state, session.user_id(), client_id.as_ref()).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
