use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, from_document, oid::ObjectId};
use serde::Deserialize;
use serde::Serialize;
use std::time::SystemTime;

use crate::error::{AppError, AppResult};
use crate::models::{Currency, Expense};

use super::AppState;

#[derive(Debug, Default)]
pub struct NewExpense {
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub currency: Option<Currency>,
    pub category: String,
    pub expense_date: Option<DateTime>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ExpenseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub expense_date: Option<DateTime>,
    pub tags: Option<Vec<String>>,
}

/// Per-category rollup produced by the breakdown aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub amount: f64,
    pub count: i64,
}

/// Rounds a currency amount half-up to 2 decimals. Decimal halves such as
/// 19.995 sit just below the true half in binary, so the scaled value is
/// nudged before rounding to keep them going up.
pub(crate) fn round_to_cents(amount: f64) -> f64 {
    let scaled = amount * 100.0;
    (scaled + scaled.signum() * 1e-9).round() / 100.0
}

pub async fn list_expenses(state: &AppState, user_id: &ObjectId) -> AppResult<Vec<Expense>> {
    let mut cursor = state.expenses.find(doc! { "userId": user_id }).await?;
    let mut expenses = Vec::new();
    while let Some(expense) = cursor.try_next().await? {
        expenses.push(expense);
    }
    Ok(expenses)
}

pub async fn get_expense_by_id(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
) -> AppResult<Option<Expense>> {
    state
        .expenses
        .find_one(doc! { "_id": id, "userId": user_id })
        .await
        .map_err(Into::into)
}

pub async fn create_expense(
    state: &AppState,
    user_id: &ObjectId,
    input: NewExpense,
) -> AppResult<Expense> {
    let title = input.title.trim().to_string();
    let category = input.category.trim().to_string();
    if title.is_empty() || category.is_empty() {
        return Err(AppError::validation(
            "title, amount, and category are required fields",
        ));
    }
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(AppError::validation(
            "amount must be a valid positive number",
        ));
    }

    let now = DateTime::from_system_time(SystemTime::now());
    let expense = Expense {
        id: None,
        user_id: user_id.clone(),
        title,
        description: input.description.trim().to_string(),
        amount: round_to_cents(input.amount),
        currency: input.currency.unwrap_or_default(),
        category,
        expense_date: input.expense_date.unwrap_or(now),
        tags: clean_tags(input.tags),
        created_at: Some(now),
        updated_at: None,
    };

    let res = state.expenses.insert_one(&expense).await?;
    let id = res
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Other(anyhow::anyhow!("expense insert missing _id")))?;

    get_expense_by_id(state, user_id, &id)
        .await?
        .ok_or_else(|| AppError::not_found("expense not found"))
}

pub async fn update_expense(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
    input: ExpenseUpdate,
) -> AppResult<Expense> {
    get_expense_by_id(state, user_id, id)
        .await?
        .ok_or_else(|| {
            AppError::not_found("expense not found or you do not have permission to update it")
        })?;

    let mut set = doc! { "updatedAt": DateTime::from_system_time(SystemTime::now()) };
    if let Some(title) = input.title {
        set.insert("title", title.trim().to_string());
    }
    if let Some(description) = input.description {
        set.insert("description", description.trim().to_string());
    }
    if let Some(amount) = input.amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::validation(
                "amount must be a valid positive number",
            ));
        }
        set.insert("amount", round_to_cents(amount));
    }
    if let Some(currency) = input.currency {
        set.insert("currency", currency.as_str());
    }
    if let Some(category) = input.category {
        set.insert("category", category);
    }
    if let Some(expense_date) = input.expense_date {
        set.insert("expenseDate", expense_date);
    }
    if let Some(tags) = input.tags {
        set.insert("tags", clean_tags(tags));
    }

    state
        .expenses
        .update_one(doc! { "_id": id, "userId": user_id }, doc! { "$set": set })
        .await?;

    get_expense_by_id(state, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("expense not found"))
}

pub async fn delete_expense(
    state: &AppState,
    user_id: &ObjectId,
    id: &ObjectId,
) -> AppResult<Expense> {
    state
        .expenses
        .find_one_and_delete(doc! { "_id": id, "userId": user_id })
        .await?
        .ok_or_else(|| {
            AppError::not_found("expense not found or you do not have permission to delete it")
        })
}

/// Groups a user's expenses by category, summing amounts and counting
/// documents, largest total first.
pub async fn expense_breakdown(
    state: &AppState,
    user_id: &ObjectId,
) -> AppResult<Vec<CategoryBreakdown>> {
    let pipeline = vec![
        doc! { "$match": { "userId": user_id } },
        doc! { "$group": {
            "_id": "$category",
            "amount": { "$sum": "$amount" },
            "count": { "$sum": 1 },
        } },
        doc! { "$project": {
            "category": "$_id",
            "amount": 1,
            "count": 1,
            "_id": 0,
        } },
        doc! { "$sort": { "amount": -1 } },
    ];

    let mut cursor = state.expenses.aggregate(pipeline).await?;
    let mut breakdown = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        breakdown.push(from_document::<CategoryBreakdown>(doc).map_err(anyhow::Error::from)?);
    }
    Ok(breakdown)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_decimal_halves_up() {
        assert_eq!(round_to_cents(19.995), 20.00);
        assert_eq!(round_to_cents(2.005), 2.01);
        assert_eq!(round_to_cents(0.125), 0.13);
    }

    #[test]
    fn rounds_below_half_down() {
        assert_eq!(round_to_cents(19.994), 19.99);
        assert_eq!(round_to_cents(10.0), 10.0);
        assert_eq!(round_to_cents(0.004), 0.0);
    }

    #[test]
    fn tags_are_trimmed_and_blanks_dropped() {
        let tags = clean_tags(vec![" travel ".into(), "".into(), "  ".into(), "gear".into()]);
        assert_eq!(tags, vec!["travel".to_string(), "gear".to_string()]);
    }
}
