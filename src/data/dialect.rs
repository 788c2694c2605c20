//! SQL dialect branching.
//!
//! The hive runs on SQLite and the MySQL family, which disagree on timestamp
//! arithmetic. Queries that need "seconds since column X" in SQL ask this
//! module for the backend-appropriate fragment at build time instead of
//! interpolating dialect-specific strings at the call site.

use sea_orm::DbBackend;

/// SQL expression evaluating to the whole seconds elapsed since `column`.
///
/// Evaluates to NULL when the column is NULL, which makes comparisons against
/// it falsy — exactly what the sync-lock expiry predicate wants.
pub fn seconds_since(backend: DbBackend, column: &str) -> String {
    match backend {
        DbBackend::MySql => format!("(UNIX_TIMESTAMP() - UNIX_TIMESTAMP({column}))"),
        _ => format!(
            "(CAST(strftime('%s', 'now') AS INTEGER) - CAST(strftime('%s', {column}) AS INTEGER))"
        ),
    }
}
