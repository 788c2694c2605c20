//! Error type for test setup and fixtures.

use thiserror::Error;

/// Anything that can go wrong while assembling or driving a test hive.
#[derive(Error, Debug)]
pub enum TestError {
    /// Database error from schema creation or fixture insertion.
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
    /// Error bubbled up from the apiary core under test.
    #[error(transparent)]
    Apiary(#[from] apiary::Error),
}
