//! Activity-profiler failures.

use thiserror::Error;

/// Why an activity profile could not be built or written.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The worker table holds no completed lifespans and no explicit range
    /// was given, so there is nothing to bucket.
    #[error("no worker activity recorded and no explicit date range given")]
    NoActivity,
    /// The requested range is empty or inverted.
    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange {
        /// Requested start of the range.
        start: chrono::NaiveDateTime,
        /// Requested end of the range.
        end: chrono::NaiveDateTime,
    },
    /// The output file extension selects no supported render format.
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),
    /// The chart backend failed while drawing.
    #[error("failed to render chart: {0}")]
    Render(String),
}
