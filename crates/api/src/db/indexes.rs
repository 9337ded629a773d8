//! Declared indexes and startup synchronization.
//!
//! Indexes that carry invariants live here rather than in migrations. At
//! startup [`sync_indexes`] builds any that are missing. If rows already
//! violate a unique index, `PostgreSQL` refuses to build it; the offending
//! groups are collected into [`IndexSyncError::ConflictingData`] and
//! [`resolve_sync_outcome`] decides, per [`IndexSyncPolicy`], whether startup
//! continues.
//!
//! Replicas may start together. Each index is checked and built while holding
//! a transaction-scoped advisory lock, so only one of them runs the
//! `CREATE INDEX` and the others see it as existing.

use std::fmt;
use std::str::FromStr;

use sqlx::{PgExecutor, PgPool};
use thiserror::Error;

/// A storage index declared in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name, unique within the schema.
    pub name: &'static str,
    /// Indexed table.
    pub table: &'static str,
    /// Indexed columns, in order.
    pub columns: &'static [&'static str],
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexDefinition {
    /// The `CREATE INDEX` statement for this definition.
    #[must_use]
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE {unique}INDEX IF NOT EXISTS {name} ON {table} ({columns})",
            unique = if self.unique { "UNIQUE " } else { "" },
            name = self.name,
            table = self.table,
            columns = self.columns.join(", "),
        )
    }

    /// A query listing groups of rows that share the indexed columns.
    #[must_use]
    pub fn duplicates_query(&self) -> String {
        let key = self
            .columns
            .iter()
            .map(|c| format!("'{c}=' || {c}::text"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "SELECT concat_ws(', ', {key}) AS key, COUNT(*) AS copies \
             FROM {table} GROUP BY {columns} HAVING COUNT(*) > 1 \
             ORDER BY copies DESC, key LIMIT {limit}",
            table = self.table,
            columns = self.columns.join(", "),
            limit = MAX_REPORTED_DUPLICATES,
        )
    }
}

/// One contact name per owner.
pub const CONTACT_OWNER_NAME: IndexDefinition = IndexDefinition {
    name: "contact_owner_name_key",
    table: "contact",
    columns: &["owner_id", "name"],
    unique: true,
};

/// Every index synchronized at startup.
pub const DECLARED_INDEXES: &[IndexDefinition] = &[CONTACT_OWNER_NAME];

/// Cap on duplicate groups reported per index.
const MAX_REPORTED_DUPLICATES: i64 = 50;

/// Advisory lock key serializing index builds across replicas ("contacts").
const INDEX_SYNC_LOCK_KEY: i64 = 0x636f_6e74_6163_7473;

/// What startup does when existing rows prevent a unique index from being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSyncPolicy {
    /// Log every conflicting group and keep starting.
    #[default]
    Warn,
    /// Refuse to start.
    Strict,
}

impl FromStr for IndexSyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            other => Err(format!("expected 'warn' or 'strict', got '{other}'")),
        }
    }
}

impl fmt::Display for IndexSyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn => f.write_str("warn"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// A set of rows sharing the same indexed key.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DuplicateGroup {
    /// The shared key, rendered as `column=value` pairs.
    pub key: String,
    /// How many rows share it.
    pub copies: i64,
}

/// Outcome of a successful sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSyncReport {
    /// Indexes built by this run.
    pub created: Vec<&'static str>,
    /// Indexes that were already present.
    pub existing: Vec<&'static str>,
}

/// Errors raised while synchronizing indexes.
#[derive(Debug, Error)]
pub enum IndexSyncError {
    /// Existing rows violate a unique index, so it could not be built.
    #[error("index {index} cannot be built: {} duplicate key group(s) in existing data", .duplicates.len())]
    ConflictingData {
        /// Name of the index that failed.
        index: &'static str,
        /// The offending key groups.
        duplicates: Vec<DuplicateGroup>,
    },

    /// Any other database failure.
    #[error("index sync failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether an index with this name exists in the current schema.
///
/// # Errors
///
/// Returns `sqlx::Error` if the catalog query fails.
pub async fn index_exists<'e>(
    executor: impl PgExecutor<'e>,
    index: &IndexDefinition,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1 FROM pg_indexes
            WHERE schemaname = current_schema() AND indexname = $1
        )
        ",
    )
    .bind(index.name)
    .fetch_one(executor)
    .await
}

/// Groups of existing rows that would violate `index` (empty for non-unique
/// indexes).
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn find_duplicates(
    pool: &PgPool,
    index: &IndexDefinition,
) -> Result<Vec<DuplicateGroup>, sqlx::Error> {
    if !index.unique {
        return Ok(Vec::new());
    }

    let query = index.duplicates_query();
    sqlx::query_as::<_, DuplicateGroup>(&query)
        .fetch_all(pool)
        .await
}

/// Build every declared index that does not exist yet.
///
/// Safe to run from several processes at once: the existence check and the
/// build happen under one advisory lock, and an index another process
/// built in the meantime is reported as existing.
///
/// # Errors
///
/// Returns [`IndexSyncError::ConflictingData`] for the first unique index
/// that existing rows violate, and [`IndexSyncError::Database`] for anything
/// else.
pub async fn sync_indexes(
    pool: &PgPool,
    declared: &[IndexDefinition],
) -> Result<IndexSyncReport, IndexSyncError> {
    let mut report = IndexSyncReport::default();

    for index in declared {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(INDEX_SYNC_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        if index_exists(&mut *tx, index).await? {
            tx.commit().await?;
            tracing::debug!(index = index.name, "Index already present");
            report.existing.push(index.name);
            continue;
        }

        let create = index.create_statement();
        match sqlx::query(&create).execute(&mut *tx).await {
            Ok(_) => {
                tx.commit().await?;
                tracing::info!(index = index.name, table = index.table, "Index created");
                report.created.push(index.name);
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await?;

                let duplicates = find_duplicates(pool, index).await?;
                if !duplicates.is_empty() {
                    return Err(IndexSyncError::ConflictingData {
                        index: index.name,
                        duplicates,
                    });
                }

                // Name clash in the catalog: built elsewhere without the lock
                if index_exists(pool, index).await? {
                    tracing::debug!(index = index.name, "Index built concurrently");
                    report.existing.push(index.name);
                    continue;
                }

                return Err(sqlx::Error::Database(db_err).into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

/// Apply the configured policy to a sync result.
///
/// Under [`IndexSyncPolicy::Warn`] conflicting data is logged and swallowed;
/// under [`IndexSyncPolicy::Strict`] it is returned. Database failures are
/// always returned.
///
/// # Errors
///
/// Returns the sync error when the policy does not tolerate it.
pub fn resolve_sync_outcome(
    result: Result<IndexSyncReport, IndexSyncError>,
    policy: IndexSyncPolicy,
) -> Result<IndexSyncReport, IndexSyncError> {
    match result {
        Ok(report) => {
            tracing::info!(
                created = report.created.len(),
                existing = report.existing.len(),
                "Indexes synchronized"
            );
            Ok(report)
        }
        Err(IndexSyncError::ConflictingData { index, duplicates })
            if policy == IndexSyncPolicy::Warn =>
        {
            for group in &duplicates {
                tracing::warn!(
                    index,
                    key = %group.key,
                    copies = group.copies,
                    "Existing rows violate declared unique index"
                );
            }
            tracing::warn!(
                index,
                "Index not built; uniqueness is NOT enforced until duplicates are resolved \
                 and `contacts-cli indexes sync` is run"
            );
            Ok(IndexSyncReport::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_index_statement() {
        assert_eq!(
            CONTACT_OWNER_NAME.create_statement(),
            "CREATE UNIQUE INDEX IF NOT EXISTS contact_owner_name_key ON contact (owner_id, name)"
        );
    }

    #[test]
    fn test_non_unique_statement() {
        let index = IndexDefinition {
            name: "contact_phone_idx",
            table: "contact",
            columns: &["phone"],
            unique: false,
        };
        assert_eq!(
            index.create_statement(),
            "CREATE INDEX IF NOT EXISTS contact_phone_idx ON contact (phone)"
        );
    }

    #[test]
    fn test_duplicates_query_groups_by_all_columns() {
        let sql = CONTACT_OWNER_NAME.duplicates_query();
        assert!(sql.contains("GROUP BY owner_id, name"));
        assert!(sql.contains("'owner_id=' || owner_id::text"));
        assert!(sql.contains("HAVING COUNT(*) > 1"));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("warn".parse::<IndexSyncPolicy>(), Ok(IndexSyncPolicy::Warn));
        assert_eq!("STRICT".parse::<IndexSyncPolicy>(), Ok(IndexSyncPolicy::Strict));
        assert!("fail".parse::<IndexSyncPolicy>().is_err());
    }

    fn conflict() -> Result<IndexSyncReport, IndexSyncError> {
        Err(IndexSyncError::ConflictingData {
            index: CONTACT_OWNER_NAME.name,
            duplicates: vec![DuplicateGroup {
                key: "owner_id=1, name=Bob".to_owned(),
                copies: 2,
            }],
        })
    }

    #[test]
    fn test_warn_policy_tolerates_conflicting_data() {
        let report = resolve_sync_outcome(conflict(), IndexSyncPolicy::Warn).unwrap();
        assert!(report.created.is_empty());
    }

    #[test]
    fn test_strict_policy_rejects_conflicting_data() {
        let err = resolve_sync_outcome(conflict(), IndexSyncPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            IndexSyncError::ConflictingData { index: "contact_owner_name_key", .. }
        ));
    }

    #[test]
    fn test_database_errors_are_fatal_under_both_policies() {
        for policy in [IndexSyncPolicy::Warn, IndexSyncPolicy::Strict] {
            let result = resolve_sync_outcome(Err(sqlx::Error::PoolTimedOut.into()), policy);
            assert!(matches!(result, Err(IndexSyncError::Database(_))));
        }
    }

    #[test]
    fn test_success_passes_through() {
        let report = IndexSyncReport {
            created: vec!["contact_owner_name_key"],
            existing: vec![],
        };
        assert_eq!(
            resolve_sync_outcome(Ok(report.clone()), IndexSyncPolicy::Strict).unwrap(),
            report
        );
    }
}
