#[path = "common/mod.rs"]
mod common;

use gigbook::error::AppError;
use gigbook::state::{
    ExpenseUpdate, NewExpense, create_expense, delete_expense, get_expense_by_id, list_expenses,
    update_expense,
};

fn expense(title: &str, amount: f64) -> NewExpense {
    NewExpense {
        title: title.to_string(),
        amount,
        category: "General".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_rounds_amount_to_cents() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let created = create_expense(&state, &user_id, expense("Domain", 19.995))
        .await
        .unwrap();
    assert_eq!(created.amount, 20.00);

    let stored = get_expense_by_id(&state, &user_id, &created.id.clone().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.amount, 20.00);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn create_rejects_missing_fields_and_bad_amounts() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let err = create_expense(&state, &user_id, expense("", 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = create_expense(&state, &user_id, expense("Coffee", 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = create_expense(&state, &user_id, expense("Coffee", f64::NAN))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(list_expenses(&state, &user_id).await.unwrap().is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn update_and_delete_round_trip() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let created = create_expense(&state, &user_id, expense("Stock photos", 49.0))
        .await
        .unwrap();
    let id = created.id.clone().unwrap();

    let updated = update_expense(
        &state,
        &user_id,
        &id,
        ExpenseUpdate {
            amount: Some(59.499),
            category: Some("Assets".to_string()),
            tags: Some(vec![" design ".to_string(), String::new()]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.amount, 59.50);
    assert_eq!(updated.category, "Assets");
    assert_eq!(updated.tags, vec!["design".to_string()]);
    assert!(updated.updated_at.is_some());

    let removed = delete_expense(&state, &user_id, &id).await.unwrap();
    assert_eq!(removed.id, Some(id.clone()));
    assert!(
        get_expense_by_id(&state, &user_id, &id)
            .await
            .unwrap()
            .is_none()
    );

    // Deleting again is a not-found, not a silent success.
    let err = delete_expense(&state, &user_id, &id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn expenses_are_scoped_to_their_owner() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;
    let other_id = gigbook::state::register_user(
        &state,
        "Other User",
        "other@example.com",
        "secret123",
        None,
    )
    .await
    .unwrap();

    let created = create_expense(&state, &user_id, expense("Course", 200.0))
        .await
        .unwrap();
    let id = created.id.clone().unwrap();

    assert!(
        get_expense_by_id(&state, &other_id, &id)
            .await
            .unwrap()
            .is_none()
    );
    let err = delete_expense(&state, &other_id, &id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    common::teardown(Some(ctx)).await;
}
