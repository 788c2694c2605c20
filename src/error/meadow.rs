//! Meadow driver failures.
//!
//! An unreachable meadow is never grounds for declaring its workers dead; the
//! garbage collector logs it and moves on. Missing capabilities surface here
//! so callers can guard optional driver features explicitly.

use thiserror::Error;

/// A per-backend driver call failed.
#[derive(Error, Debug)]
pub enum MeadowError {
    /// The backend did not answer a status or accounting query.
    #[error("meadow '{meadow_type}' is unreachable: {message}")]
    Unreachable {
        /// Type of the meadow that failed to answer.
        meadow_type: String,
        /// Driver-reported detail.
        message: String,
    },
    /// The driver does not implement an optional capability.
    #[error("meadow '{meadow_type}' does not support {capability}")]
    UnsupportedCapability {
        /// Type of the limited meadow.
        meadow_type: String,
        /// Capability that was requested.
        capability: &'static str,
    },
    /// The backend refused or failed a worker submission.
    #[error("meadow '{meadow_type}' failed to submit workers: {message}")]
    Submission {
        /// Type of the meadow the submission went to.
        meadow_type: String,
        /// Driver-reported detail.
        message: String,
    },
}
