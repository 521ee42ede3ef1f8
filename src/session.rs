// session.rs
// Bearer-token middleware to protect routes and an extractor to access the
// authenticated user inside handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::models::User;
use crate::state::{AppState, find_user_by_session, refresh_user_analytics};

#[derive(Clone)]
pub struct SessionData {
    pub user: User,
    pub user_id: ObjectId,
    pub token: String,
}

pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_bearer_token(request.headers()) else {
        return Err(unauthorized_response("not authorized, no token provided"));
    };

    let user = match find_user_by_session(&state, &token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(unauthorized_response("not authorized, invalid token")),
        Err(err) => {
            tracing::error!(error = %err, "session lookup failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "session lookup failed" })),
            )
                .into_response());
        }
    };

    let Some(user_id) = user.id.clone() else {
        return Err(unauthorized_response("not authorized, invalid token"));
    };

    // Keep the dashboard cache and the current month's revenue row warm.
    // Failures are logged inside and never block the request.
    refresh_user_analytics(&state, &user_id).await;

    request.extensions_mut().insert(SessionData {
        user,
        user_id,
        token,
    });
    Ok(next.run(request).await)
}

pub struct SessionUser(pub SessionData);

impl SessionUser {
    pub fn user(&self) -> &User {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }

    pub fn user_id(&self) -> &ObjectId {
        &self.0.user_id
    }
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let data = parts
            .extensions
            .get::<SessionData>()
            .cloned()
            .ok_or_else(|| unauthorized_response("not authorized"));

        Box::pin(async move {
            match data {
                Ok(session) => Ok(SessionUser(session)),
                Err(resp) => Err(resp),
            }
        })
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}
