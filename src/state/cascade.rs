// cascade.rs
// Cleanup of dependent collections when a parent entity is deleted. The
// store has no foreign keys, so every delete entry point calls the matching
// function here explicitly. Sub-deletes are best-effort and at-least-once:
// a failure is logged and the remaining cleanups still run; deleting
// already-absent dependents is a zero-count success. Nothing in this module
// can fail the parent delete.

use mongodb::Collection;
use mongodb::bson::{Document, doc, oid::ObjectId};

use crate::models::Project;

use super::{AppState, adjust_project_count};

/// Per-collection result of one cascade pass.
#[derive(Debug, Default)]
pub struct CascadeOutcome {
    pub deleted: Vec<(&'static str, u64)>,
    pub failed: Vec<&'static str>,
}

impl CascadeOutcome {
    fn record(
        &mut self,
        collection: &'static str,
        result: Result<u64, mongodb::error::Error>,
    ) {
        match result {
            Ok(count) => self.deleted.push((collection, count)),
            Err(err) => {
                tracing::warn!(collection, error = %err, "cascade sub-delete failed");
                self.failed.push(collection);
            }
        }
    }

    pub fn deleted_in(&self, collection: &str) -> u64 {
        self.deleted
            .iter()
            .find(|(name, _)| *name == collection)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// User delete: dashboard cache, revenue rows and expenses for that
/// `userId` go away. The three deletes are independent and run in parallel.
pub async fn cascade_user_delete(state: &AppState, user_id: &ObjectId) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();

    let (dashboards, revenues, expenses) = tokio::join!(
        delete_many_counted(&state.dashboard_stats, doc! { "userId": user_id }),
        delete_many_counted(&state.revenues, doc! { "userId": user_id }),
        delete_many_counted(&state.expenses, doc! { "userId": user_id }),
    );
    outcome.record("dashboards", dashboards);
    outcome.record("revenues", revenues);
    outcome.record("expenses", expenses);

    tracing::info!(user = %user_id, deleted = ?outcome.deleted, "user cascade complete");
    outcome
}

/// Client delete: projects, revenue rows and expenses referencing the
/// client go away. Revenue and Expense documents do not define a `clientId`
/// field, so those two filters only match records written by an older
/// schema; the filters are kept as-is pending a product decision.
pub async fn cascade_client_delete(
    state: &AppState,
    user_id: &ObjectId,
    client_id: &ObjectId,
) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();

    let (projects, revenues, expenses) = tokio::join!(
        delete_many_counted(
            &state.projects,
            doc! { "clientId": client_id, "userId": user_id },
        ),
        delete_many_counted(
            &state.revenues,
            doc! { "clientId": client_id, "userId": user_id },
        ),
        delete_many_counted(
            &state.expenses,
            doc! { "clientId": client_id, "userId": user_id },
        ),
    );
    outcome.record("projects", projects);
    outcome.record("revenues", revenues);
    outcome.record("expenses", expenses);

    tracing::info!(client = %client_id, deleted = ?outcome.deleted, "client cascade complete");
    outcome
}

/// Project delete: estimates for the project go away and the owning
/// client's `projects` counter drops by one (floored at zero).
pub async fn cascade_project_delete(state: &AppState, project: &Project) -> CascadeOutcome {
    let mut outcome = CascadeOutcome::default();

    let project_id = match project.id.as_ref() {
        Some(id) => id,
        None => return outcome,
    };

    outcome.record(
        "estimates",
        delete_many_counted(&state.estimates, doc! { "projectId": project_id }).await,
    );

    if let Err(err) = adjust_project_count(state, &project.client_id, -1).await {
        tracing::warn!(client = %project.client_id, error = %err, "project count decrement failed");
        outcome.failed.push("clients");
    }

    tracing::info!(project = %project_id, deleted = ?outcome.deleted, "project cascade complete");
    outcome
}

async fn delete_many_counted<T: Send + Sync>(
    collection: &Collection<T>,
    filter: Document,
) -> Result<u64, mongodb::error::Error> {
    collection
        .delete_many(filter)
        .await
        .map(|res| res.deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_sub_delete_keeps_the_other_results() {
        let mut outcome = CascadeOutcome::default();
        outcome.record("projects", Ok(3));
        outcome.record(
            "revenues",
            Err(mongodb::error::Error::from(std::io::Error::other(
                "connection reset",
            ))),
        );
        outcome.record("expenses", Ok(1));

        assert_eq!(outcome.deleted_in("projects"), 3);
        assert_eq!(outcome.deleted_in("expenses"), 1);
        assert_eq!(outcome.failed, vec!["revenues"]);
        // The failed collection reports no deletions.
        assert_eq!(outcome.deleted_in("revenues"), 0);
    }
}
