// milestones.rs
// Lifecycle of the milestone sub-documents embedded in projects. Mutations
// use atomic array operators ($push/$pull/positional $set) so concurrent
// writers on the same project cannot lose each other's milestones.

use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::error::{AppError, AppResult};
use crate::models::{Milestone, MilestoneStatus, Project};

use super::AppState;

const UPCOMING_WINDOW_DAYS: u64 = 30;
const RECENT_PAYMENT_WINDOW_DAYS: u64 = 30;
const STATS_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub name: String,
    pub description: String,
    pub percentage: f64,
    pub amount: f64,
    pub due_date: DateTime,
    pub status: Option<MilestoneStatus>,
    pub notes: Option<String>,
}

/// Milestone flattened with its project context for list/stat replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneView {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub project_id: ObjectId,
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSummary {
    pub total: usize,
    pub pending: usize,
    pub paid: usize,
    pub overdue: usize,
    pub total_value: f64,
    pub pending_value: f64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneStats {
    pub total_milestones: usize,
    pub pending_milestones: usize,
    pub paid_milestones: usize,
    pub overdue_milestones: usize,
    pub total_value: f64,
    pub pending_value: f64,
    pub paid_value: f64,
    pub overdue_value: f64,
    pub upcoming_milestones: Vec<MilestoneView>,
    pub recent_payments: Vec<MilestoneView>,
}

/// Status as the reader should see it: a pending milestone past its due
/// date counts as overdue. Derived on every read, never persisted.
pub(crate) fn effective_status(milestone: &Milestone, now: DateTime) -> MilestoneStatus {
    if milestone.status == MilestoneStatus::Pending && milestone.due_date < now {
        MilestoneStatus::Overdue
    } else {
        milestone.status
    }
}

/// All milestones across a client's projects, sorted by due date, with a
/// stored-status summary.
pub async fn list_client_milestones(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
) -> AppResult<(Vec<MilestoneView>, MilestoneSummary)> {
    let client = state
        .clients
        .find_one(doc! { "_id": client_id, "userId": user_id })
        .await?;
    let client_name = client.map(|c| c.name);

    let mut cursor = state
        .projects
        .find(doc! { "clientId": client_id, "userId": user_id })
        .await?;
    let mut projects = Vec::new();
    while let Some(project) = cursor.try_next().await? {
        projects.push(project);
    }
    if projects.is_empty() {
        return Err(AppError::not_found("no projects found for this client"));
    }

    let mut views = Vec::new();
    for project in &projects {
        for milestone in &project.milestones {
            views.push(MilestoneView {
                milestone: milestone.clone(),
                project_id: project.id.clone().unwrap_or_default(),
                project_name: project.name.clone(),
                client_name: client_name.clone(),
                total_amount: project.total_amount,
            });
        }
    }
    views.sort_by_key(|v| v.milestone.due_date);

    let mut summary = MilestoneSummary {
        total: views.len(),
        ..Default::default()
    };
    for view in &views {
        let m = &view.milestone;
        summary.total_value += m.amount;
        match m.status {
            MilestoneStatus::Pending => {
                summary.pending += 1;
                summary.pending_value += m.amount;
            }
            MilestoneStatus::Paid => summary.paid += 1,
            MilestoneStatus::Overdue => summary.overdue += 1,
        }
    }

    Ok((views, summary))
}

/// Appends one milestone to a project the caller owns. A milestone created
/// directly as `Paid` gets its payment date stamped. The 100%-sum check
/// applies only to bulk creation; single adds are deliberately unchecked.
pub async fn add_milestone(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
    project_id: &ObjectId,
    input: NewMilestone,
) -> AppResult<Milestone> {
    validate_milestone_fields(&input)?;

    let project = state
        .projects
        .find_one(doc! { "_id": project_id, "clientId": client_id, "userId": user_id })
        .await?
        .ok_or_else(|| AppError::not_found("project not found or access denied"))?;
    let project_id = project.id.clone().unwrap_or_else(|| project_id.clone());

    let now = DateTime::from_system_time(SystemTime::now());
    let status = input.status.unwrap_or_default();
    let milestone = Milestone {
        id: ObjectId::new(),
        name: input.name.trim().to_string(),
        description: input.description,
        percentage: input.percentage,
        amount: input.amount,
        due_date: input.due_date,
        status,
        is_achived: false,
        paid_date: (status == MilestoneStatus::Paid).then_some(now),
        notes: input.notes,
        created_at: Some(now),
        updated_at: Some(now),
    };

    state
        .projects
        .update_one(
            doc! { "_id": &project_id },
            doc! {
                "$push": { "milestones": to_bson(&milestone)? },
                "$set": { "updatedAt": now },
            },
        )
        .await?;

    Ok(milestone)
}

/// Replaces the project's entire milestone list with the given set. The
/// percentages must not sum past 100; the project's timeline and selected
/// estimate can be set in the same write.
pub async fn create_milestones(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
    project_id: &ObjectId,
    milestones: Vec<NewMilestone>,
    estimate_id: Option<ObjectId>,
    start_date: Option<DateTime>,
    end_date: Option<DateTime>,
) -> AppResult<Project> {
    if milestones.is_empty() {
        return Err(AppError::validation(
            "milestones array is required and cannot be empty",
        ));
    }
    for input in &milestones {
        validate_milestone_fields(input)?;
    }

    let total_percentage: f64 = milestones.iter().map(|m| m.percentage).sum();
    if total_percentage > 100.0 {
        return Err(AppError::validation(format!(
            "total milestone percentages cannot exceed 100%. current total: {total_percentage}%"
        )));
    }

    state
        .projects
        .find_one(doc! { "_id": project_id, "clientId": client_id, "userId": user_id })
        .await?
        .ok_or_else(|| AppError::not_found("project not found or access denied"))?;

    let now = DateTime::from_system_time(SystemTime::now());
    let docs: Vec<Milestone> = milestones
        .into_iter()
        .map(|input| {
            let status = input.status.unwrap_or_default();
            Milestone {
                id: ObjectId::new(),
                name: input.name.trim().to_string(),
                description: input.description,
                percentage: input.percentage,
                amount: input.amount,
                due_date: input.due_date,
                status,
                is_achived: false,
                paid_date: (status == MilestoneStatus::Paid).then_some(now),
                notes: input.notes,
                created_at: Some(now),
                updated_at: Some(now),
            }
        })
        .collect();

    let mut set = doc! {
        "milestones": to_bson(&docs)?,
        "updatedAt": now,
    };
    if let Some(start_date) = start_date {
        set.insert("startDate", start_date);
    }
    if let Some(end_date) = end_date {
        set.insert("endDate", end_date);
    }
    if let Some(estimate_id) = estimate_id {
        set.insert("estimateId", estimate_id);
    }

    state
        .projects
        .update_one(doc! { "_id": project_id }, doc! { "$set": set })
        .await?;

    state
        .projects
        .find_one(doc! { "_id": project_id })
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

/// Flips the achieved flag on a milestone located by its sub-id. Only the
/// flag and the timestamps change; the stored status is left alone.
pub async fn achieve_milestone(
    state: &AppState,
    user_id: &ObjectId,
    milestone_id: &ObjectId,
) -> AppResult<Milestone> {
    let filter = doc! { "userId": user_id, "milestones._id": milestone_id };
    let project = state
        .projects
        .find_one(filter.clone())
        .await?
        .ok_or_else(|| AppError::not_found("milestone not found or access denied"))?;

    let now = DateTime::from_system_time(SystemTime::now());
    state
        .projects
        .update_one(
            filter,
            doc! { "$set": {
                "milestones.$.isAchived": true,
                "milestones.$.updatedAt": now,
                "updatedAt": now,
            } },
        )
        .await?;

    let mut milestone = project
        .milestones
        .into_iter()
        .find(|m| &m.id == milestone_id)
        .ok_or_else(|| AppError::not_found("milestone not found"))?;
    milestone.is_achived = true;
    milestone.updated_at = Some(now);
    Ok(milestone)
}

/// Removes a milestone unless it has already been paid.
pub async fn delete_milestone(
    state: &AppState,
    user_id: &ObjectId,
    milestone_id: &ObjectId,
) -> AppResult<Milestone> {
    let filter = doc! { "userId": user_id, "milestones._id": milestone_id };
    let project = state
        .projects
        .find_one(filter.clone())
        .await?
        .ok_or_else(|| AppError::not_found("milestone not found or access denied"))?;

    let milestone = project
        .milestones
        .iter()
        .find(|m| &m.id == milestone_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("milestone not found"))?;

    if milestone.status == MilestoneStatus::Paid {
        return Err(AppError::validation("cannot delete a paid milestone"));
    }

    let now = DateTime::from_system_time(SystemTime::now());
    state
        .projects
        .update_one(
            filter,
            doc! {
                "$pull": { "milestones": { "_id": milestone_id } },
                "$set": { "updatedAt": now },
            },
        )
        .await?;

    Ok(milestone)
}

/// Aggregate milestone counts and values for a user, optionally narrowed to
/// one client, with the ten soonest upcoming milestones and the ten most
/// recent payments.
pub async fn milestone_stats(
    state: &AppState,
    user_id: &ObjectId,
    client_id: Option<&ObjectId>,
) -> AppResult<MilestoneStats> {
    let mut filter = doc! { "userId": user_id };
    if let Some(client_id) = client_id {
        filter.insert("clientId", client_id);
    }

    let mut cursor = state.projects.find(filter).await?;
    let mut projects = Vec::new();
    while let Some(project) = cursor.try_next().await? {
        projects.push(project);
    }

    // One lookup per distinct client to label the views.
    let mut client_names: HashMap<ObjectId, String> = HashMap::new();
    for project in &projects {
        if client_names.contains_key(&project.client_id) {
            continue;
        }
        if let Some(client) = state
            .clients
            .find_one(doc! { "_id": &project.client_id })
            .await?
        {
            client_names.insert(project.client_id.clone(), client.name);
        }
    }

    let mut stats = MilestoneStats::default();

    let now = DateTime::from_system_time(SystemTime::now());
    let upcoming_horizon = DateTime::from_system_time(
        SystemTime::now() + Duration::from_secs(UPCOMING_WINDOW_DAYS * 24 * 60 * 60),
    );
    let payment_floor = DateTime::from_system_time(
        SystemTime::now() - Duration::from_secs(RECENT_PAYMENT_WINDOW_DAYS * 24 * 60 * 60),
    );

    for project in &projects {
        let project_id = project.id.clone().unwrap_or_default();
        for milestone in &project.milestones {
            stats.total_milestones += 1;
            stats.total_value += milestone.amount;

            let view = || MilestoneView {
                milestone: milestone.clone(),
                project_id: project_id.clone(),
                project_name: project.name.clone(),
                client_name: client_names.get(&project.client_id).cloned(),
                total_amount: project.total_amount,
            };

            match effective_status(milestone, now) {
                MilestoneStatus::Pending => {
                    stats.pending_milestones += 1;
                    stats.pending_value += milestone.amount;
                    if milestone.due_date <= upcoming_horizon {
                        stats.upcoming_milestones.push(view());
                    }
                }
                MilestoneStatus::Paid => {
                    stats.paid_milestones += 1;
                    stats.paid_value += milestone.amount;
                    if milestone.paid_date.is_some_and(|d| d >= payment_floor) {
                        stats.recent_payments.push(view());
                    }
                }
                MilestoneStatus::Overdue => {
                    stats.overdue_milestones += 1;
                    stats.overdue_value += milestone.amount;
                }
            }
        }
    }

    stats.upcoming_milestones.sort_by_key(|v| v.milestone.due_date);
    stats.upcoming_milestones.truncate(STATS_LIST_LIMIT);
    stats
        .recent_payments
        .sort_by(|a, b| b.milestone.paid_date.cmp(&a.milestone.paid_date));
    stats.recent_payments.truncate(STATS_LIST_LIMIT);

    Ok(stats)
}

fn validate_milestone_fields(input: &NewMilestone) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("milestone name is required"));
    }
    if !(0.0..=100.0).contains(&input.percentage) {
        return Err(AppError::validation("percentage must be between 0 and 100"));
    }
    if input.amount < 0.0 {
        return Err(AppError::validation("amount cannot be negative"));
    }
    Ok(())
}
