// routes/mod.rs
// JSON API handlers grouped by domain, plus the shared request parsing
// helpers they all use.

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod estimates;
pub mod expenses;
pub mod milestones;
pub mod projects;

use axum::{
    Json, Router, middleware,
    routing::{delete, get, post, put},
};
use chrono::{NaiveDate, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::session;
use crate::state::AppState;

/// Full application router: the public auth endpoints plus everything
/// behind the session middleware.
pub fn api_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify-token", get(auth::verify_token))
        .route("/api/auth/delete-account", delete(auth::delete_account))
        .route("/api/clients/get-all-clients", get(clients::get_all_clients))
        .route("/api/clients/create-client", post(clients::add_client))
        .route("/api/clients/update-client/{id}", put(clients::edit_client))
        .route(
            "/api/clients/delete-client/{id}",
            delete(clients::remove_client),
        )
        .route(
            "/api/clients/get-client-projects/{clientId}",
            get(projects::get_client_projects),
        )
        .route(
            "/api/clients/create-project/{clientId}",
            post(projects::add_project),
        )
        .route("/api/update-project/{id}", put(projects::edit_project))
        .route(
            "/api/clients/delete-project/{id}",
            delete(projects::remove_project),
        )
        .route(
            "/api/clients/get-client-milestones/{clientId}",
            get(milestones::get_client_milestones),
        )
        .route(
            "/api/milestones/create-milestones/{clientId}",
            post(milestones::create_project_milestones),
        )
        .route(
            "/api/milestones/add-milestone/{projectId}",
            post(milestones::add_project_milestone),
        )
        .route(
            "/api/milestones/achieve-milestone/{id}",
            put(milestones::mark_milestone_achieved),
        )
        .route(
            "/api/clients/delete-milestone/{id}",
            delete(milestones::remove_milestone),
        )
        .route(
            "/api/milestones/milestone-stats",
            get(milestones::get_milestone_stats),
        )
        .route(
            "/api/estimates/add-all-estimates/{id}",
            post(estimates::add_all_estimates),
        )
        .route(
            "/api/estimates/all-estimates/{id}",
            get(estimates::get_all_estimates),
        )
        .route(
            "/api/estimates/select-estimate/{id}",
            put(estimates::select_estimate_by_id),
        )
        .route(
            "/api/expenses/get-all-expenses",
            get(expenses::get_all_expenses),
        )
        .route("/api/expenses/create-expense", post(expenses::add_expense))
        .route(
            "/api/expenses/update-expense/{id}",
            put(expenses::edit_expense),
        )
        .route(
            "/api/expenses/delete-expense/{id}",
            delete(expenses::remove_expense),
        )
        .route(
            "/api/analytics/dashboard-stats",
            get(dashboard::dashboard_stats),
        )
        .route(
            "/api/analytics/revenue-over-time",
            get(dashboard::revenue_over_time),
        )
        .route(
            "/api/analytics/expense-breakdown",
            get(dashboard::expense_breakdown_stats),
        )
        .route(
            "/api/analytics/revenue-period",
            get(dashboard::revenue_for_period),
        )
        .route("/api/analytics/month-revenue", get(dashboard::month_revenue))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    Router::new()
        .route("/", get(welcome))
        .route("/api/auth/create-account", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the gigbook API" }))
}

pub(crate) fn parse_object_id(raw: &str, what: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::validation(format!("invalid {what} id")))
}

/// Accepts the two date formats the frontend sends: RFC 3339 timestamps and
/// bare `YYYY-MM-DD` dates (read as midnight UTC).
pub(crate) fn parse_date(raw: &str) -> AppResult<DateTime> {
    let raw = raw.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(DateTime::from_chrono(ts.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let ts = date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| AppError::validation(format!("invalid date: {raw}")))?;
        return Ok(DateTime::from_chrono(ts));
    }
    Err(AppError::validation(format!("invalid date: {raw}")))
}

pub(crate) fn parse_optional_date(raw: &Option<String>) -> AppResult<Option<DateTime>> {
    match raw.as_deref() {
        Some(s) if !s.trim().is_empty() => parse_date(s).map(Some),
        _ => Ok(None),
    }
}
