// routes/projects.rs
// Project CRUD. Creation and listing hang off the owning client; update and
// delete address the project directly.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::routes::{parse_object_id, parse_optional_date};
use crate::session::SessionUser;
use crate::state::{
    AppState, NewProject, ProjectUpdate, create_project, delete_project, list_client_projects,
    update_project,
};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn get_client_projects(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(client_id): Path<String>,
) -> AppResult<Json<Value>> {
    let client_id = parse_object_id(&client_id, "client")?;
    let projects = list_client_projects(&state, session.user_id(), &client_id).await?;
    Ok(Json(json!({ "success": true, "data": projects })))
}

pub async fn add_project(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(client_id): Path<String>,
    Json(body): Json<ProjectRequest>,
) -> AppResult<Response> {
    let client_id = parse_object_id(&client_id, "client")?;
    let input = NewProject {
        name: body.name,
        title: body.title,
        description: body.description,
        status: body.status,
        total_amount: body.total_amount,
        currency: body.currency,
        start_date: parse_optional_date(&body.start_date)?,
        end_date: parse_optional_date(&body.end_date)?,
        tags: body.tags.unwrap_or_default(),
    };
    let project = create_project(&state, session.user_id(), &client_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "project created successfully",
            "data": project,
        })),
    )
        .into_response())
}

pub async fn edit_project(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(body): Json<ProjectRequest>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "project")?;
    let input = ProjectUpdate {
        name: body.name,
        title: body.title,
        description: body.description,
        status: body.status,
        total_amount: body.total_amount,
        currency: body.currency,
        start_date: parse_optional_date(&body.start_date)?,
        end_date: parse_optional_date(&body.end_date)?,
        tags: body.tags,
    };
    let project = update_project(&state, session.user_id(), &id, input).await?;
    Ok(Json(json!({ "success": true, "data": project })))
}

pub async fn remove_project(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "project")?;
    let outcome = delete_project(&state, session.user_id(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "project deleted successfully",
        "deletedEstimates": outcome.deleted_in("estimates"),
    })))
}
