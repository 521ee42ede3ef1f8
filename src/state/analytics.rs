// analytics.rs
// The aggregation side of the app: dashboard rollup, per-month revenue
// calculation, and the stored-revenue period query. Everything here is a
// derived view over the primary collections; callers treat recomputation
// as best-effort and advisory.

use anyhow::Context;
use chrono::Datelike;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use serde::Serialize;
use std::time::SystemTime;

use crate::error::{AppError, AppResult};
use crate::models::{DashboardStats, Month, Revenue};

use super::AppState;

/// Computed (not yet persisted) revenue for one user-month.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSnapshot {
    pub user_id: ObjectId,
    pub year: i32,
    pub month: Month,
    pub revenue: f64,
    pub calculated_at: DateTime,
}

/// Recomputes the cached dashboard document for a user from scratch and
/// upserts it. Revenue is the sum of selected-estimate prices across the
/// user's projects, not collected payments. Idempotent: with unchanged
/// underlying data only `lastUpdated` moves.
pub async fn recompute_dashboard_stats(
    state: &AppState,
    user_id: &ObjectId,
) -> AppResult<DashboardStats> {
    let mut total_revenue = 0.0;
    let mut cursor = state.projects.find(doc! { "userId": user_id }).await?;
    while let Some(project) = cursor.try_next().await? {
        let Some(project_id) = project.id.as_ref() else {
            continue;
        };
        let mut estimates = state
            .estimates
            .find(doc! { "projectId": project_id, "isSelected": true })
            .await?;
        while let Some(estimate) = estimates.try_next().await? {
            total_revenue += estimate.price;
        }
    }

    let (total_clients, active_clients, total_expenses, active_projects, completed_projects) = tokio::join!(
        state.clients.count_documents(doc! { "userId": user_id }),
        state
            .clients
            .count_documents(doc! { "userId": user_id, "status": "Active" }),
        total_expense_amount(state, user_id),
        state.projects.count_documents(doc! { "userId": user_id }),
        state
            .projects
            .count_documents(doc! { "userId": user_id, "status": "completed" }),
    );

    let total_clients = total_clients? as i64;
    let active_clients = active_clients? as i64;
    let total_expenses = total_expenses?;
    let active_projects = active_projects? as i64;
    let completed_projects = completed_projects? as i64;

    let now = DateTime::from_system_time(SystemTime::now());
    state
        .dashboard_stats
        .find_one_and_update(
            doc! { "userId": user_id },
            doc! { "$set": {
                "totalClients": total_clients,
                "activeClients": active_clients,
                "totalRevenue": total_revenue,
                "totalExpenses": total_expenses,
                "activeProjects": active_projects,
                "completedProjects": completed_projects,
                "lastUpdated": now,
            } },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .context("dashboard upsert returned no document")
        .map_err(Into::into)
}

pub async fn get_dashboard_stats(
    state: &AppState,
    user_id: &ObjectId,
) -> AppResult<Option<DashboardStats>> {
    state
        .dashboard_stats
        .find_one(doc! { "userId": user_id })
        .await
        .map_err(Into::into)
}

/// Revenue attributable to the current calendar month: the sum of amounts
/// of achieved milestones whose last modification falls inside it. Pure
/// computation; the caller decides whether to persist the snapshot.
pub async fn calculate_current_month_revenue(
    state: &AppState,
    user_id: &ObjectId,
) -> AppResult<RevenueSnapshot> {
    let now = chrono::Utc::now();
    let year = now.year();
    let month = Month::from_month0(now.month0());

    let mut revenue = 0.0;
    let mut cursor = state.projects.find(project_match(user_id)).await?;
    while let Some(project) = cursor.try_next().await? {
        for milestone in &project.milestones {
            if !milestone.is_achived {
                continue;
            }
            let Some(updated_at) = milestone.updated_at else {
                continue;
            };
            let achieved = updated_at.to_chrono();
            if achieved.year() == year && Month::from_month0(achieved.month0()) == month {
                revenue += milestone.amount;
            }
        }
    }

    Ok(RevenueSnapshot {
        user_id: user_id.clone(),
        year,
        month,
        revenue,
        calculated_at: DateTime::from_system_time(SystemTime::now()),
    })
}

/// Historical variant of the revenue calculation for an arbitrary year and
/// month (given as a full English name; anything else is a validation
/// error).
pub async fn calculate_month_revenue(
    state: &AppState,
    user_id: &ObjectId,
    year: i32,
    month_name: &str,
) -> AppResult<RevenueSnapshot> {
    let month = Month::parse(month_name).ok_or_else(|| {
        AppError::validation(
            "invalid month name. use full month names like January, February, etc.",
        )
    })?;

    let projects = state.db.collection::<Document>("projects");
    let mut cursor = projects.find(project_match(user_id)).await?;
    let mut revenue = 0.0;
    while let Some(project) = cursor.try_next().await? {
        let Ok(milestones) = project.get_array("milestones") else {
            continue;
        };
        for entry in milestones {
            let Some(milestone) = entry.as_document() else {
                continue;
            };
            // Reads `isAchieved`; milestones written by this app store the
            // flag as `isAchived`, so only documents carrying the alternate
            // spelling match. Kept as-is pending a product decision.
            if !milestone.get_bool("isAchieved").unwrap_or(false) {
                continue;
            }
            let Ok(updated_at) = milestone.get_datetime("updatedAt") else {
                continue;
            };
            let achieved = updated_at.to_chrono();
            if achieved.year() == year && achieved.month0() as usize == month.ordinal() {
                revenue += milestone.get_f64("amount").unwrap_or(0.0);
            }
        }
    }

    Ok(RevenueSnapshot {
        user_id: user_id.clone(),
        year,
        month,
        revenue,
        calculated_at: DateTime::from_system_time(SystemTime::now()),
    })
}

/// Upserts a computed snapshot into the revenue collection, keyed by
/// `(userId, year, month)`.
pub async fn upsert_month_revenue(
    state: &AppState,
    snapshot: &RevenueSnapshot,
) -> AppResult<Revenue> {
    state
        .revenues
        .find_one_and_update(
            doc! {
                "userId": &snapshot.user_id,
                "year": snapshot.year,
                "month": snapshot.month.name(),
            },
            doc! { "$set": {
                "revenue": snapshot.revenue,
                "calculatedAt": snapshot.calculated_at,
            } },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .context("revenue upsert returned no document")
        .map_err(Into::into)
}

pub async fn list_revenue(state: &AppState, user_id: &ObjectId) -> AppResult<Vec<Revenue>> {
    let mut cursor = state.revenues.find(doc! { "userId": user_id }).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        rows.push(row);
    }
    Ok(rows)
}

/// Stored revenue rows for an inclusive month range, possibly spanning
/// years. Reads the cache only; nothing is recomputed. Rows come back
/// ordered by year, then month ordinal.
pub async fn get_revenue_for_period(
    state: &AppState,
    user_id: &ObjectId,
    start_year: i32,
    start_month: Month,
    end_year: i32,
    end_month: Month,
) -> AppResult<Vec<Revenue>> {
    let filter = period_filter(user_id, start_year, start_month, end_year, end_month);
    let mut cursor = state.revenues.find(filter).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        rows.push(row);
    }
    // Month is stored by name; ordering has to use the ordinal, not the
    // string.
    rows.sort_by_key(|r| (r.year, r.month.ordinal()));
    Ok(rows)
}

/// Best-effort refresh of the dashboard cache and the current month's
/// revenue row, fired on every authenticated request. Failures are logged
/// and swallowed so the surrounding request keeps going.
pub async fn refresh_user_analytics(state: &AppState, user_id: &ObjectId) {
    if let Err(err) = recompute_dashboard_stats(state, user_id).await {
        tracing::warn!(user = %user_id, error = %err, "dashboard recompute failed");
    }
    match calculate_current_month_revenue(state, user_id).await {
        Ok(snapshot) => {
            if let Err(err) = upsert_month_revenue(state, &snapshot).await {
                tracing::warn!(user = %user_id, error = %err, "revenue upsert failed");
            }
        }
        Err(err) => tracing::warn!(user = %user_id, error = %err, "revenue calculation failed"),
    }
}

/// Legacy dual match: early records stored the owner under `clientId`, so
/// both fields are checked when scanning projects for revenue.
fn project_match(user_id: &ObjectId) -> Document {
    doc! { "$or": [ { "userId": user_id }, { "clientId": user_id } ] }
}

fn period_filter(
    user_id: &ObjectId,
    start_year: i32,
    start_month: Month,
    end_year: i32,
    end_month: Month,
) -> Document {
    if start_year == end_year {
        doc! {
            "userId": user_id,
            "year": start_year,
            "month": { "$in": Month::names_in_range(start_month.ordinal(), end_month.ordinal()) },
        }
    } else {
        let mut or = vec![
            doc! {
                "year": start_year,
                "month": { "$in": Month::names_in_range(start_month.ordinal(), 11) },
            },
            doc! {
                "year": end_year,
                "month": { "$in": Month::names_in_range(0, end_month.ordinal()) },
            },
        ];
        for year in (start_year + 1)..end_year {
            or.push(doc! { "year": year });
        }
        doc! { "userId": user_id, "$or": or }
    }
}

async fn total_expense_amount(state: &AppState, user_id: &ObjectId) -> AppResult<f64> {
    let pipeline = vec![
        doc! { "$match": { "userId": user_id } },
        doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount" } } },
    ];
    let mut cursor = state.expenses.aggregate(pipeline).await?;
    match cursor.try_next().await? {
        Some(doc) => Ok(doc.get_f64("total").unwrap_or(0.0)),
        None => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_filter_same_year_uses_month_in_list() {
        let user_id = ObjectId::new();
        let filter = period_filter(&user_id, 2024, Month::March, 2024, Month::May);
        assert_eq!(filter.get_i32("year").unwrap(), 2024);
        let months = filter
            .get_document("month")
            .unwrap()
            .get_array("$in")
            .unwrap();
        let names: Vec<&str> = months.iter().filter_map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["March", "April", "May"]);
    }

    #[test]
    fn period_filter_across_years_builds_three_part_or() {
        let user_id = ObjectId::new();
        let filter = period_filter(&user_id, 2022, Month::November, 2024, Month::February);
        let or = filter.get_array("$or").unwrap();
        assert_eq!(or.len(), 3);

        let start = or[0].as_document().unwrap();
        assert_eq!(start.get_i32("year").unwrap(), 2022);
        let start_months: Vec<&str> = start
            .get_document("month")
            .unwrap()
            .get_array("$in")
            .unwrap()
            .iter()
            .filter_map(|m| m.as_str())
            .collect();
        assert_eq!(start_months, vec!["November", "December"]);

        let end = or[1].as_document().unwrap();
        assert_eq!(end.get_i32("year").unwrap(), 2024);
        let end_months: Vec<&str> = end
            .get_document("month")
            .unwrap()
            .get_array("$in")
            .unwrap()
            .iter()
            .filter_map(|m| m.as_str())
            .collect();
        assert_eq!(end_months, vec!["January", "February"]);

        let middle = or[2].as_document().unwrap();
        assert_eq!(middle.get_i32("year").unwrap(), 2023);
    }
}
