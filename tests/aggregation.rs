#[path = "common/mod.rs"]
mod common;

use std::time::{Duration, SystemTime};

use chrono::Datelike;
use mongodb::bson::DateTime;

use gigbook::error::AppError;
use gigbook::models::{Month, Revenue};
use gigbook::state::{
    AppState, NewEstimate, NewExpense, NewMilestone, NewProject, achieve_milestone,
    calculate_current_month_revenue, calculate_month_revenue, create_expense, create_milestones,
    create_project, expense_breakdown, get_revenue_for_period, recompute_dashboard_stats,
    replace_estimates, select_estimate, upsert_month_revenue,
};

fn due_in_days(days: u64) -> DateTime {
    DateTime::from_system_time(SystemTime::now() + Duration::from_secs(days * 24 * 60 * 60))
}

fn milestone(name: &str, percentage: f64, amount: f64) -> NewMilestone {
    NewMilestone {
        name: name.to_string(),
        description: String::new(),
        percentage,
        amount,
        due_date: due_in_days(14),
        status: None,
        notes: None,
    }
}

fn estimate(name: &str, price: f64) -> NewEstimate {
    NewEstimate {
        name: name.to_string(),
        description: "plan".to_string(),
        timeline: "4 weeks".to_string(),
        price,
        features: vec![],
        tech_stack: vec![],
    }
}

async fn seed_project(
    state: &AppState,
    user_id: &mongodb::bson::oid::ObjectId,
    client_id: &mongodb::bson::oid::ObjectId,
    name: &str,
) -> mongodb::bson::oid::ObjectId {
    create_project(
        state,
        user_id,
        client_id,
        NewProject {
            name: Some(name.to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
    .unwrap()
}

#[tokio::test]
async fn dashboard_recompute_is_idempotent() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, client_id) = common::seed_user_and_client(&state).await;
    let project_id = seed_project(&state, &user_id, &client_id, "Site").await;

    let stored = replace_estimates(
        &state,
        &user_id,
        &project_id,
        vec![estimate("Basic", 5000.0), estimate("Premium", 9000.0)],
    )
    .await
    .unwrap();
    let selected = select_estimate(&state, &stored[0].id.clone().unwrap())
        .await
        .unwrap();

    create_expense(
        &state,
        &user_id,
        NewExpense {
            title: "Hosting".to_string(),
            amount: 120.0,
            category: "Infrastructure".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let first = recompute_dashboard_stats(&state, &user_id).await.unwrap();
    let second = recompute_dashboard_stats(&state, &user_id).await.unwrap();

    assert_eq!(first.total_clients, 1);
    assert_eq!(first.active_clients, 1);
    assert_eq!(first.total_expenses, 120.0);
    assert_eq!(first.active_projects, 1);
    assert_eq!(first.completed_projects, 0);
    // Revenue comes from the selected estimate only.
    assert_eq!(first.total_revenue, selected.price);

    assert_eq!(first.total_clients, second.total_clients);
    assert_eq!(first.active_clients, second.active_clients);
    assert_eq!(first.total_revenue, second.total_revenue);
    assert_eq!(first.total_expenses, second.total_expenses);
    assert_eq!(first.active_projects, second.active_projects);
    assert_eq!(first.completed_projects, second.completed_projects);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn current_month_revenue_counts_achieved_milestones_only() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, client_id) = common::seed_user_and_client(&state).await;
    let project_id = seed_project(&state, &user_id, &client_id, "App").await;

    let project = create_milestones(
        &state,
        &user_id,
        &client_id,
        &project_id,
        vec![milestone("Deposit", 40.0, 4000.0), milestone("Delivery", 60.0, 6000.0)],
        None,
        None,
        None,
    )
    .await
    .unwrap();

    achieve_milestone(&state, &user_id, &project.milestones[0].id)
        .await
        .unwrap();

    let snapshot = calculate_current_month_revenue(&state, &user_id)
        .await
        .unwrap();
    assert_eq!(snapshot.revenue, 4000.0);

    let now = chrono::Utc::now();
    assert_eq!(snapshot.year, now.year());
    assert_eq!(snapshot.month, Month::from_month0(now.month0()));

    common::teardown(Some(ctx)).await;
}

// The historical variant checks a differently spelled achieved flag than the
// one milestone writes store, so it sees nothing even when the current-month
// calculation does. Flagged for a product decision; this pins the behavior.
#[tokio::test]
async fn month_revenue_misses_milestones_the_current_variant_counts() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, client_id) = common::seed_user_and_client(&state).await;
    let project_id = seed_project(&state, &user_id, &client_id, "App").await;

    let project = create_milestones(
        &state,
        &user_id,
        &client_id,
        &project_id,
        vec![milestone("Deposit", 40.0, 4000.0)],
        None,
        None,
        None,
    )
    .await
    .unwrap();
    achieve_milestone(&state, &user_id, &project.milestones[0].id)
        .await
        .unwrap();

    let current = calculate_current_month_revenue(&state, &user_id)
        .await
        .unwrap();
    assert_eq!(current.revenue, 4000.0);

    let now = chrono::Utc::now();
    let historical = calculate_month_revenue(
        &state,
        &user_id,
        now.year(),
        Month::from_month0(now.month0()).name(),
    )
    .await
    .unwrap();
    assert_eq!(historical.revenue, 0.0);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn month_revenue_rejects_invalid_month_name() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let err = calculate_month_revenue(&state, &user_id, 2024, "Smarch")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn revenue_period_spanning_years_returns_ordered_rows() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let now = DateTime::from_system_time(SystemTime::now());
    let rows = vec![
        (2023, Month::October, 1.0),
        (2023, Month::November, 2.0),
        (2023, Month::December, 3.0),
        (2024, Month::January, 4.0),
        (2024, Month::February, 5.0),
        (2024, Month::March, 6.0),
    ];
    let docs: Vec<Revenue> = rows
        .into_iter()
        .map(|(year, month, revenue)| Revenue {
            id: None,
            user_id: user_id.clone(),
            year,
            month,
            revenue,
            calculated_at: now,
        })
        .collect();
    state.revenues.insert_many(&docs).await.unwrap();

    let period = get_revenue_for_period(
        &state,
        &user_id,
        2023,
        Month::November,
        2024,
        Month::February,
    )
    .await
    .unwrap();

    let got: Vec<(i32, Month, f64)> = period
        .iter()
        .map(|r| (r.year, r.month, r.revenue))
        .collect();
    assert_eq!(
        got,
        vec![
            (2023, Month::November, 2.0),
            (2023, Month::December, 3.0),
            (2024, Month::January, 4.0),
            (2024, Month::February, 5.0),
        ]
    );

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn upserting_same_month_twice_keeps_one_row() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    let mut snapshot = calculate_current_month_revenue(&state, &user_id)
        .await
        .unwrap();
    upsert_month_revenue(&state, &snapshot).await.unwrap();
    snapshot.revenue = 777.0;
    let stored = upsert_month_revenue(&state, &snapshot).await.unwrap();
    assert_eq!(stored.revenue, 777.0);

    let count = state
        .revenues
        .count_documents(mongodb::bson::doc! { "userId": &user_id })
        .await
        .unwrap();
    assert_eq!(count, 1);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn expense_breakdown_groups_by_category_largest_first() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let (user_id, _client_id) = common::seed_user_and_client(&state).await;

    for (title, category, amount) in [
        ("Figma", "Software", 15.0),
        ("JetBrains", "Software", 25.0),
        ("Flight", "Travel", 300.0),
    ] {
        create_expense(
            &state,
            &user_id,
            NewExpense {
                title: title.to_string(),
                amount,
                category: category.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let breakdown = expense_breakdown(&state, &user_id).await.unwrap();
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].category, "Travel");
    assert_eq!(breakdown[0].amount, 300.0);
    assert_eq!(breakdown[0].count, 1);
    assert_eq!(breakdown[1].category, "Software");
    assert_eq!(breakdown[1].amount, 40.0);
    assert_eq!(breakdown[1].count, 2);

    common::teardown(Some(ctx)).await;
}
