// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Collection, Database, IndexModel, options::IndexOptions};
use std::env;

use crate::models::{
    Client, DashboardStats, Estimate, Expense, Project, Revenue, Session, User,
};

mod analytics;
mod cascade;
mod clients;
mod estimates;
mod expenses;
mod milestones;
mod projects;
mod users;

pub use analytics::*;
pub use cascade::*;
pub use clients::*;
pub use estimates::*;
pub use expenses::*;
pub use milestones::*;
pub use projects::*;
pub use users::*;

pub const SESSION_TTL_SECONDS: u64 = 60 * 60 * 24 * 30; // 30 days

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub users: Collection<User>,
    pub sessions: Collection<Session>,
    pub clients: Collection<Client>,
    pub projects: Collection<Project>,
    pub estimates: Collection<Estimate>,
    pub expenses: Collection<Expense>,
    pub dashboard_stats: Collection<DashboardStats>,
    pub revenues: Collection<Revenue>,
}

/// Opens the store connection and builds every collection handle in one
/// explicit, ordered pass. Indexes are created before any handle is handed
/// out; there is no deferred or timing-based registration.
pub async fn init_state() -> Result<AppState> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "gigbook".to_string());

    let client = MongoClient::with_uri_str(uri).await?;
    let db = client.database(&db_name);

    ensure_indexes(&db).await?;

    Ok(AppState {
        users: db.collection::<User>("users"),
        sessions: db.collection::<Session>("sessions"),
        clients: db.collection::<Client>("clients"),
        projects: db.collection::<Project>("projects"),
        estimates: db.collection::<Estimate>("estimates"),
        expenses: db.collection::<Expense>("expenses"),
        dashboard_stats: db.collection::<DashboardStats>("dashboards"),
        revenues: db.collection::<Revenue>("revenues"),
        db,
    })
}

async fn ensure_indexes(db: &Database) -> Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<User>("users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    // Compound uniqueness backs the revenue upsert.
    db.collection::<Revenue>("revenues")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "userId": 1, "year": 1, "month": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<DashboardStats>("dashboards")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "userId": 1 })
                .options(unique)
                .build(),
        )
        .await?;

    Ok(())
}
