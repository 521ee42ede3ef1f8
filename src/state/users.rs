use anyhow::Context;
use bcrypt::{DEFAULT_COST, hash, verify};
use data_encoding::BASE32_NOPAD;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rand::RngCore;
use std::time::{Duration, SystemTime};

use crate::error::{AppError, AppResult};
use crate::models::{Session, User};

use super::{AppState, SESSION_TTL_SECONDS, cascade_user_delete};

pub async fn find_user_by_email(state: &AppState, email: &str) -> AppResult<Option<User>> {
    state
        .users
        .find_one(doc! { "email": email })
        .await
        .map_err(Into::into)
}

pub async fn get_user_by_id(state: &AppState, id: &ObjectId) -> AppResult<Option<User>> {
    state
        .users
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

/// Registers a new account. The avatar defaults to the first letter of the
/// name, uppercased, matching what the frontend renders for users without
/// an uploaded image.
pub async fn register_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    role: Option<String>,
) -> AppResult<ObjectId> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::validation("name, email and password are required"));
    }

    if find_user_by_email(state, email).await?.is_some() {
        return Err(AppError::validation("user already exists"));
    }

    let hashed = hash(password, DEFAULT_COST).map_err(anyhow::Error::from)?;
    let avatar = name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    let res = state
        .users
        .insert_one(User {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            password: hashed,
            role: role.unwrap_or_else(|| "user".to_string()),
            avatar,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;

    res.inserted_id
        .as_object_id()
        .context("user insert missing _id")
        .map_err(Into::into)
}

/// Checks a login attempt and returns the matching user.
pub async fn verify_credentials(state: &AppState, email: &str, password: &str) -> AppResult<User> {
    let user = find_user_by_email(state, email)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let matches = verify(password, &user.password).map_err(anyhow::Error::from)?;
    if !matches {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }
    Ok(user)
}

pub async fn create_session(state: &AppState, user_id: &ObjectId) -> AppResult<String> {
    // One live session per user.
    let _ = state.sessions.delete_many(doc! { "userId": user_id }).await;

    let mut token_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut token_bytes);
    let token = BASE32_NOPAD.encode(&token_bytes);

    let expires_at =
        DateTime::from_system_time(SystemTime::now() + Duration::from_secs(SESSION_TTL_SECONDS));

    state
        .sessions
        .insert_one(Session {
            id: None,
            token: token.clone(),
            user_id: user_id.clone(),
            expires_at,
        })
        .await?;

    Ok(token)
}

pub async fn find_user_by_session(state: &AppState, token: &str) -> AppResult<Option<User>> {
    if let Some(session) = state.sessions.find_one(doc! { "token": token }).await? {
        if session.expires_at.to_system_time() <= SystemTime::now() {
            // Remove expired session, ignore result
            let _ = state.sessions.delete_one(doc! { "token": token }).await;
            return Ok(None);
        }
        get_user_by_id(state, &session.user_id).await
    } else {
        Ok(None)
    }
}

pub async fn delete_session(state: &AppState, token: &str) -> AppResult<()> {
    let _ = state.sessions.delete_one(doc! { "token": token }).await?;
    Ok(())
}

/// Deletes the account and cleans up everything keyed by its `userId`.
/// The cascade runs after the primary delete and cannot fail it.
pub async fn delete_user(state: &AppState, user_id: &ObjectId) -> AppResult<()> {
    let res = state.users.delete_one(doc! { "_id": user_id }).await?;
    if res.deleted_count == 0 {
        return Err(AppError::not_found("user not found"));
    }

    let _ = state.sessions.delete_many(doc! { "userId": user_id }).await;
    cascade_user_delete(state, user_id).await;
    Ok(())
}
