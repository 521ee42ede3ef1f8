// routes/auth.rs
// Account registration, login/logout, token verification and account
// deletion. Login hands out a bearer token the client sends back in the
// Authorization header.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::User;
use crate::session::SessionUser;
use crate::state::{
    AppState, create_session, delete_session, delete_user, get_user_by_id, register_user,
    verify_credentials,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn user_payload(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "role": user.role,
        "avatar": user.avatar,
    })
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Response> {
    let id = register_user(&state, &body.name, &body.email, &body.password, body.role).await?;
    let user = get_user_by_id(&state, &id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "user created successfully",
            "user": user.as_ref().map(user_payload),
        })),
    )
        .into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let user = verify_credentials(&state, &body.email, &body.password).await?;
    let user_id = user
        .id
        .clone()
        .ok_or_else(|| crate::error::AppError::not_found("user not found"))?;
    let token = create_session(&state, &user_id).await?;

    tracing::info!(user = %user_id, "login");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": user_payload(&user),
    })))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    delete_session(&state, session.token()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "logged out successfully",
    })))
}

pub async fn verify_token(session: SessionUser) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "token is valid",
        "user": user_payload(session.user()),
    }))
}

pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    delete_user(&state, session.user_id()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "account deleted",
    })))
}
