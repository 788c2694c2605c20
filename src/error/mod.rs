//! Error types for the apiary core.
//!
//! Failures are grouped by domain (lookups, worker specialization, meadow
//! drivers, profiling) and aggregated into a single [`Error`] via
//! `thiserror`'s transparent conversions, so every core operation can return
//! one result type while callers still match on the specific failure.

pub mod lookup;
pub mod meadow;
pub mod profile;
pub mod specialization;

use thiserror::Error;

pub use self::lookup::LookupError;
pub use self::meadow::MeadowError;
pub use self::profile::ProfileError;
pub use self::specialization::SpecializationError;

/// Main error type for apiary core operations.
///
/// The core never retries internally: database errors propagate unchanged so
/// the beekeeper driving the coordinator can apply its own retry policy, and
/// every mutation is a single `UPDATE … WHERE` making that retry safe.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown analysis, logic name, resource class, job or worker.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// A worker could not be bound to an analysis.
    #[error(transparent)]
    Specialization(#[from] SpecializationError),
    /// A meadow driver call failed or the capability is missing.
    #[error(transparent)]
    Meadow(#[from] MeadowError),
    /// Activity-profile construction or rendering failed.
    #[error(transparent)]
    Profile(#[from] ProfileError),
    /// Database error (query failures, connection issues, constraint violations).
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
    /// Filesystem error (worker log directory creation).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
