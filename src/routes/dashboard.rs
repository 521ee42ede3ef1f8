// routes/dashboard.rs
// Read-side analytics endpoints. The session middleware keeps the caches
// these serve from warm, so handlers only read.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::Month;
use crate::session::SessionUser;
use crate::state::{
    AppState, calculate_month_revenue, expense_breakdown, get_dashboard_stats,
    get_revenue_for_period, list_revenue,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub start_year: i32,
    pub start_month: String,
    pub end_year: i32,
    pub end_month: String,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: String,
}

pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    let stats = get_dashboard_stats(&state, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

pub async fn revenue_over_time(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    let revenue = list_revenue(&state, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "data": revenue })))
}

pub async fn expense_breakdown_stats(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    let breakdown = expense_breakdown(&state, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "data": breakdown })))
}

pub async fn revenue_for_period(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Json<Value>> {
    let start_month = parse_month(&query.start_month)?;
    let end_month = parse_month(&query.end_month)?;
    let rows = get_revenue_for_period(
        &state,
        session.user_id(),
        query.start_year,
        start_month,
        query.end_year,
        end_month,
    )
    .await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

/// Historical backfill: computes (without persisting) the revenue for one
/// named month.
pub async fn month_revenue(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Value>> {
    let snapshot =
        calculate_month_revenue(&state, session.user_id(), query.year, &query.month).await?;
    Ok(Json(json!({ "success": true, "data": snapshot })))
}

fn parse_month(raw: &str) -> AppResult<Month> {
    Month::parse(raw).ok_or_else(|| {
        AppError::validation(
            "invalid month name. use full month names like January, February, etc.",
        )
    })
}
