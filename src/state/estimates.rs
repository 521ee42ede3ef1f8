use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use std::time::SystemTime;

use crate::error::{AppError, AppResult};
use crate::models::Estimate;

use super::AppState;

#[derive(Debug, Clone)]
pub struct NewEstimate {
    pub name: String,
    pub description: String,
    pub timeline: String,
    pub price: f64,
    pub features: Vec<String>,
    pub tech_stack: Vec<String>,
}

pub async fn list_project_estimates(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
) -> AppResult<Vec<Estimate>> {
    ensure_project_owned(state, user_id, project_id).await?;

    let mut cursor = state
        .estimates
        .find(doc! { "projectId": project_id })
        .sort(doc! { "createdAt": -1 })
        .await?;
    let mut estimates = Vec::new();
    while let Some(estimate) = cursor.try_next().await? {
        estimates.push(estimate);
    }
    Ok(estimates)
}

/// Stores a fresh set of estimates for a project, discarding whatever was
/// there before. All of them start unselected.
pub async fn replace_estimates(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
    estimates: Vec<NewEstimate>,
) -> AppResult<Vec<Estimate>> {
    if estimates.is_empty() {
        return Err(AppError::validation(
            "estimates array is required and cannot be empty",
        ));
    }
    for estimate in &estimates {
        if estimate.name.trim().is_empty()
            || estimate.description.trim().is_empty()
            || estimate.timeline.trim().is_empty()
        {
            return Err(AppError::validation(
                "each estimate must have name, description, timeline, and price",
            ));
        }
        if estimate.price < 0.0 {
            return Err(AppError::validation("price cannot be negative"));
        }
    }

    ensure_project_owned(state, user_id, project_id).await?;

    state
        .estimates
        .delete_many(doc! { "projectId": project_id })
        .await?;

    let now = DateTime::from_system_time(SystemTime::now());
    let docs: Vec<Estimate> = estimates
        .into_iter()
        .map(|input| Estimate {
            id: None,
            project_id: project_id.clone(),
            name: input.name,
            description: input.description,
            timeline: input.timeline,
            price: input.price,
            features: input.features,
            tech_stack: input.tech_stack,
            is_selected: false,
            created_at: Some(now),
        })
        .collect();

    state.estimates.insert_many(&docs).await?;

    list_project_estimates(state, user_id, project_id).await
}

/// Marks one estimate as the committed plan for its project. The project's
/// other estimates are cleared first so at most one stays selected even
/// when two selections race.
pub async fn select_estimate(
    state: &AppState,
    estimate_id: &ObjectId,
) -> AppResult<Estimate> {
    let estimate = state
        .estimates
        .find_one(doc! { "_id": estimate_id })
        .await?
        .ok_or_else(|| AppError::not_found("estimate not found"))?;

    state
        .estimates
        .update_many(
            doc! { "projectId": &estimate.project_id, "_id": { "$ne": estimate_id } },
            doc! { "$set": { "isSelected": false } },
        )
        .await?;
    state
        .estimates
        .update_one(
            doc! { "_id": estimate_id },
            doc! { "$set": { "isSelected": true } },
        )
        .await?;

    state
        .estimates
        .find_one(doc! { "_id": estimate_id })
        .await?
        .ok_or_else(|| AppError::not_found("estimate not found"))
}

async fn ensure_project_owned(
    state: &AppState,
    user_id: &ObjectId,
    project_id: &ObjectId,
) -> AppResult<()> {
    state
        .projects
        .find_one(doc! { "_id": project_id, "userId": user_id })
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("project not found or access denied"))
}
