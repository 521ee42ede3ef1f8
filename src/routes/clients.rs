// routes/clients.rs
// Client CRUD under /api/clients.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::ClientStatus;
use crate::routes::parse_object_id;
use crate::session::SessionUser;
use crate::state::{
    AppState, create_client, delete_client, get_client_by_id, list_clients, update_client,
};

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
}

fn parse_status(raw: Option<&str>) -> AppResult<Option<ClientStatus>> {
    match raw {
        Some(value) => ClientStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("invalid client status: {value}"))),
        None => Ok(None),
    }
}

pub async fn get_all_clients(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    let clients = list_clients(&state, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "data": clients })))
}

pub async fn add_client(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(body): Json<CreateClientRequest>,
) -> AppResult<Response> {
    let status = parse_status(body.status.as_deref())?;
    let id = create_client(
        &state,
        session.user_id(),
        &body.name,
        &body.email,
        &body.company,
        status,
    )
    .await?;
    let client = get_client_by_id(&state, session.user_id(), &id)
        .await?
        .ok_or_else(|| AppError::not_found("client not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "client created successfully",
            "data": client,
        })),
    )
        .into_response())
}

pub async fn edit_client(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateClientRequest>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "client")?;
    let status = parse_status(body.status.as_deref())?;
    let client = update_client(
        &state,
        session.user_id(),
        &id,
        body.name,
        body.email,
        body.company,
        status,
    )
    .await?;
    Ok(Json(json!({ "success": true, "data": client })))
}

pub async fn remove_client(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "client")?;
    let outcome = delete_client(&state, session.user_id(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "client deleted successfully",
        "deletedProjects": outcome.deleted_in("projects"),
    })))
}
