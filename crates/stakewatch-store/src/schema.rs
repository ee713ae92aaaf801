//! Database bootstrap.
//!
//! On first run the target database does not exist; it is created together
//! with its retention policy. On every later run the existence check short
//! circuits, so calling this any number of times never creates a duplicate
//! database or mutates the policy of an existing one.

use tracing::info;

use crate::{RetentionPolicy, Result, TimeSeriesStore, DB_NAME};

/// Ensure the `network` database and its retention policy exist.
///
/// Idempotent: a database that is already present is left untouched, and no
/// policy statement is issued for it. Errors propagate to the caller; a store
/// that is unreachable here fails crawler construction.
pub async fn ensure_schema<S: TimeSeriesStore + ?Sized>(store: &S) -> Result<()> {
    let databases = store.list_databases().await?;
    if databases.iter().any(|name| name == DB_NAME) {
        info!(database = DB_NAME, "database already exists, no need to create it");
        return Ok(());
    }

    info!(database = DB_NAME, "database not found, creating it");
    store.create_database(DB_NAME).await?;
    store
        .create_retention_policy(DB_NAME, &RetentionPolicy::network_info())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockStore;

    #[tokio::test]
    async fn test_bootstrap_creates_database_and_policy() {
        let store = MockStore::new();
        ensure_schema(&store).await.expect("bootstrap");

        assert_eq!(store.created_databases(), [DB_NAME]);
        let policies = store.created_policies();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].0, DB_NAME);
        assert_eq!(policies[0].1, RetentionPolicy::network_info());
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = MockStore::new();
        ensure_schema(&store).await.expect("first bootstrap");
        ensure_schema(&store).await.expect("second bootstrap");

        assert_eq!(store.created_databases().len(), 1);
        assert_eq!(store.created_policies().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_database_left_untouched() {
        let store = MockStore::with_databases(&[DB_NAME, "telegraf"]);
        ensure_schema(&store).await.expect("bootstrap");

        assert!(store.created_databases().is_empty());
        assert!(store.created_policies().is_empty());
    }
}
