use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rand::Rng;
use std::time::SystemTime;

use crate::error::{AppError, AppResult};
use crate::models::{Currency, Project, ProjectStatus};

use super::{AppState, CascadeOutcome, adjust_project_count, cascade_project_delete};

/// Input for project creation. The frontend historically sends `title`;
/// `name` wins when both are present.
#[derive(Debug, Default)]
pub struct NewProject {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub tags: Option<Vec<String>>,
}

pub async fn list_client_projects(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
) -> AppResult<Vec<Project>> {
    ensure_client_owned(state, user_id, client_id).await?;

    let mut cursor = state
        .projects
        .find(doc! { "clientId": client_id, "userId": user_id })
        .sort(doc! { "createdAt": -1 })
        .await?;
    let mut projects = Vec::new();
    while let Some(project) = cursor.try_next().await? {
        projects.push(project);
    }
    Ok(projects)
}

pub async fn get_project(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
) -> AppResult<Project> {
    state
        .projects
        .find_one(doc! { "_id": project_id, "userId": user_id })
        .await?
        .ok_or_else(|| AppError::not_found("project not found or access denied"))
}

pub async fn create_project(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
    input: NewProject,
) -> AppResult<Project> {
    ensure_client_owned(state, user_id, client_id).await?;

    let name = input
        .name
        .or(input.title)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("project name/title is required"))?;

    let status = match input.status.as_deref() {
        Some(raw) => ProjectStatus::parse(raw)
            .ok_or_else(|| AppError::validation(format!("invalid project status: {raw}")))?,
        None => ProjectStatus::default(),
    };
    let currency = match input.currency.as_deref() {
        Some(raw) => Currency::parse(raw)
            .ok_or_else(|| AppError::validation(format!("invalid currency: {raw}")))?,
        None => Currency::default(),
    };
    if let Some(amount) = input.total_amount {
        if amount < 0.0 {
            return Err(AppError::validation("amount cannot be negative"));
        }
    }

    let now = DateTime::from_system_time(SystemTime::now());
    let project = Project {
        id: None,
        name,
        description: input.description.unwrap_or_default(),
        client_id: client_id.clone(),
        user_id: user_id.clone(),
        estimate_id: None,
        total_amount: input.total_amount,
        currency,
        status,
        start_date: input.start_date.unwrap_or(now),
        end_date: input.end_date,
        actual_end_date: None,
        milestones: Vec::new(),
        tags: input.tags,
        project_number: Some(generate_project_number()),
        created_at: Some(now),
        updated_at: Some(now),
    };

    let res = state.projects.insert_one(&project).await?;
    let id = res
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Other(anyhow::anyhow!("project insert missing _id")))?;

    adjust_project_count(state, client_id, 1).await?;

    get_project(state, user_id, &id).await
}

/// Applies a partial update. Moving to `completed` stamps `actualEndDate`
/// the first time; later updates leave the original completion date alone.
pub async fn update_project(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
    input: ProjectUpdate,
) -> AppResult<Project> {
    let existing = get_project(state, user_id, project_id).await?;

    let now = DateTime::from_system_time(SystemTime::now());
    let mut set = doc! { "updatedAt": now };

    if let Some(name) = input.name.or(input.title) {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("project name cannot be empty"));
        }
        set.insert("name", name);
    }
    if let Some(description) = input.description {
        set.insert("description", description);
    }
    if let Some(raw) = input.status.as_deref() {
        let status = ProjectStatus::parse(raw)
            .ok_or_else(|| AppError::validation(format!("invalid project status: {raw}")))?;
        set.insert("status", status.as_str());
        if status == ProjectStatus::Completed && existing.actual_end_date.is_none() {
            set.insert("actualEndDate", now);
        }
    }
    if let Some(amount) = input.total_amount {
        if amount < 0.0 {
            return Err(AppError::validation("amount cannot be negative"));
        }
        set.insert("totalAmount", amount);
    }
    if let Some(raw) = input.currency.as_deref() {
        let currency = Currency::parse(raw)
            .ok_or_else(|| AppError::validation(format!("invalid currency: {raw}")))?;
        set.insert("currency", currency.as_str());
    }
    if let Some(start_date) = input.start_date {
        set.insert("startDate", start_date);
    }
    if let Some(end_date) = input.end_date {
        set.insert("endDate", end_date);
    }
    if let Some(tags) = input.tags {
        set.insert("tags", tags);
    }

    state
        .projects
        .update_one(
            doc! { "_id": project_id, "userId": user_id },
            doc! { "$set": set },
        )
        .await?;

    get_project(state, user_id, project_id).await
}

/// Removes the project, its estimates, and one unit of the owning client's
/// project counter.
pub async fn delete_project(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
) -> AppResult<CascadeOutcome> {
    let project = get_project(state, user_id, project_id).await?;

    state
        .projects
        .delete_one(doc! { "_id": project_id, "userId": user_id })
        .await?;

    Ok(cascade_project_delete(state, &project).await)
}

async fn ensure_client_owned(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
) -> AppResult<()> {
    state
        .clients
        .find_one(doc! { "_id": client_id, "userId": user_id })
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("client not found or access denied"))
}

fn generate_project_number() -> String {
    format!("PRJ-{:06}", rand::rng().random_range(0..1_000_000))
}
