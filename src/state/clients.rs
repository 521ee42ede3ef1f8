use anyhow::Context;
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use std::time::SystemTime;

use crate::error::{AppError, AppResult};
use crate::models::{Client, ClientStatus};

use super::{AppState, CascadeOutcome, cascade_client_delete};

pub async fn list_clients(state: &AppState, user_id: &ObjectId) -> AppResult<Vec<Client>> {
    let mut cursor = state.clients.find(doc! { "userId": user_id }).await?;
    let mut clients = Vec::new();
    while let Some(client) = cursor.try_next().await? {
        clients.push(client);
    }
    Ok(clients)
}

pub async fn get_client_by_id(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
) -> AppResult<Option<Client>> {
    state
        .clients
        .find_one(doc! { "_id": id, "userId": user_id })
        .await
        .map_err(Into::into)
}

pub async fn create_client(
    state: &AppState,
    user_id: &ObjectId,
    name: &str,
    email: &str,
    company: &str,
    status: Option<ClientStatus>,
) -> AppResult<ObjectId> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("client name is required"));
    }

    let res = state
        .clients
        .insert_one(Client {
            id: None,
            user_id: user_id.clone(),
            name: name.to_string(),
            email: email.trim().to_string(),
            company: company.trim().to_string(),
            status: status.unwrap_or_default(),
            projects: 0,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
            updated_at: None,
        })
        .await?;

    res.inserted_id
        .as_object_id()
        .context("client insert missing _id")
        .map_err(Into::into)
}

pub async fn update_client(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
    name: Option<String>,
    email: Option<String>,
    company: Option<String>,
    status: Option<ClientStatus>,
) -> AppResult<Client> {
    let mut set = doc! { "updatedAt": DateTime::from_system_time(SystemTime::now()) };
    if let Some(name) = name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("client name cannot be empty"));
        }
        set.insert("name", name);
    }
    if let Some(email) = email {
        set.insert("email", email.trim().to_string());
    }
    if let Some(company) = company {
        set.insert("company", company.trim().to_string());
    }
    if let Some(status) = status {
        set.insert("status", status.as_str());
    }

    let res = state
        .clients
        .update_one(doc! { "_id": id, "userId": user_id }, doc! { "$set": set })
        .await?;
    if res.matched_count == 0 {
        return Err(AppError::not_found("client not found"));
    }

    get_client_by_id(state, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("client not found"))
}

/// Removes the client and cascades to its projects, revenue rows and
/// expenses. The cascade runs even when the client was already gone, which
/// keeps the cleanup at-least-once.
pub async fn delete_client(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
) -> AppResult<CascadeOutcome> {
    let res = state
        .clients
        .delete_one(doc! { "_id": id, "userId": user_id })
        .await?;

    let outcome = cascade_client_delete(state, user_id, id).await;

    if res.deleted_count == 0 {
        return Err(AppError::not_found("client not found"));
    }
    Ok(outcome)
}

/// Single mutation point for the denormalized `projects` counter. Negative
/// deltas only apply when the counter can absorb them, so it never drops
/// below zero.
pub(super) async fn adjust_project_count(
    state: &AppState,
    client_id: &ObjectId,
    delta: i64,
) -> AppResult<()> {
    let filter = if delta < 0 {
        doc! { "_id": client_id, "projects": { "$gte": -delta } }
    } else {
        doc! { "_id": client_id }
    };
    state
        .clients
        .update_one(filter, doc! { "$inc": { "projects": delta } })
        .await?;
    Ok(())
}
