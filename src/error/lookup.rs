//! Lookup failures: an identifier that should resolve against the database
//! did not. Always fatal to the calling operation.

use thiserror::Error;

/// A row that the caller named explicitly does not exist.
#[derive(Error, Debug)]
pub enum LookupError {
    /// No analysis with this id.
    #[error("analysis {0} not found")]
    AnalysisNotFound(i32),
    /// No analysis with this logic name.
    #[error("analysis '{0}' not found")]
    LogicNameNotFound(String),
    /// No analysis_stats row for this analysis.
    #[error("no statistics row for analysis {0}")]
    StatsNotFound(i32),
    /// No resource class with this id or name.
    #[error("resource class '{0}' not found")]
    ResourceClassNotFound(String),
    /// No job with this id.
    #[error("job {0} not found")]
    JobNotFound(i64),
}
