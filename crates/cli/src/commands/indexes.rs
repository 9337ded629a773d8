//! Declared index commands.

use contacts_api::db::indexes::{
    DECLARED_INDEXES, IndexSyncPolicy, find_duplicates, index_exists, resolve_sync_outcome,
    sync_indexes,
};

use super::{CommandError, connect};

/// Build missing declared indexes.
///
/// # Errors
///
/// Returns `CommandError::IndexSync` on database failure, or on conflicting
/// data when `strict` is set.
pub async fn sync(strict: bool) -> Result<(), CommandError> {
    let pool = connect().await?;
    let policy = if strict {
        IndexSyncPolicy::Strict
    } else {
        IndexSyncPolicy::Warn
    };

    let report = resolve_sync_outcome(sync_indexes(&pool, DECLARED_INDEXES).await, policy)?;

    for name in &report.created {
        tracing::info!(index = name, "created");
    }
    for name in &report.existing {
        tracing::info!(index = name, "already present");
    }
    Ok(())
}

/// Report index state and blocking duplicates. Changes nothing.
///
/// # Errors
///
/// Returns `CommandError::Database` if a query fails.
pub async fn check() -> Result<(), CommandError> {
    let pool = connect().await?;

    for index in DECLARED_INDEXES {
        let exists = index_exists(&pool, index).await?;
        let duplicates = find_duplicates(&pool, index).await?;

        tracing::info!(
            index = index.name,
            table = index.table,
            exists,
            duplicate_groups = duplicates.len(),
            "index status"
        );
        for group in duplicates {
            tracing::warn!(
                index = index.name,
                key = %group.key,
                copies = group.copies,
                "duplicate rows"
            );
        }
    }
    Ok(())
}
