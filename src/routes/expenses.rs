// routes/expenses.rs
// Expense CRUD under /api/expenses.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::Currency;
use crate::routes::{parse_object_id, parse_optional_date};
use crate::session::SessionUser;
use crate::state::{
    AppState, ExpenseUpdate, NewExpense, create_expense, delete_expense, list_expenses,
    update_expense,
};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub expense_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

fn parse_currency(raw: Option<&str>) -> AppResult<Option<Currency>> {
    match raw {
        Some(value) => Currency::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("invalid currency: {value}"))),
        None => Ok(None),
    }
}

pub async fn get_all_expenses(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> AppResult<Json<Value>> {
    let expenses = list_expenses(&state, session.user_id()).await?;
    Ok(Json(json!({ "success": true, "data": expenses })))
}

pub async fn add_expense(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(body): Json<ExpenseRequest>,
) -> AppResult<Response> {
    let input = NewExpense {
        title: body.title.unwrap_or_default(),
        description: body.description.unwrap_or_default(),
        amount: body.amount.unwrap_or(0.0),
        currency: parse_currency(body.currency.as_deref())?,
        category: body.category.unwrap_or_default(),
        expense_date: parse_optional_date(&body.expense_date)?,
        tags: body.tags.unwrap_or_default(),
    };
    let expense = create_expense(&state, session.user_id(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "expense created successfully",
            "data": expense,
        })),
    )
        .into_response())
}

pub async fn edit_expense(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    Json(body): Json<ExpenseRequest>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "expense")?;
    let input = ExpenseUpdate {
        title: body.title,
        description: body.description,
        amount: body.amount,
        currency: parse_currency(body.currency.as_deref())?,
        category: body.category,
        expense_date: parse_optional_date(&body.expense_date)?,
        tags: body.tags,
    };
    let expense = update_expense(&state, session.user_id(), &id, input).await?;
    Ok(Json(json!({ "success": true, "data": expense })))
}

pub async fn remove_expense(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "expense")?;
    let expense = delete_expense(&state, session.user_id(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "expense deleted successfully",
        "data": expense,
    })))
}
