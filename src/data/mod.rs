//! Data access layer repositories.
//!
//! One narrow repository per aggregate, constructed over any
//! `sea_orm::ConnectionTrait` implementor. All durable state lives in the
//! database; every mutation here is a single-row (or single-predicate)
//! `UPDATE … WHERE`, so operations stay idempotent at the row level and a
//! beekeeper-level retry is always safe.

pub mod analysis;
pub mod analysis_stats;
pub mod dialect;
pub mod job;
pub mod resource_class;
pub mod worker;

pub use self::analysis::{AnalysisRepository, NewAnalysis};
pub use self::analysis_stats::AnalysisStatsRepository;
pub use self::job::JobRepository;
pub use self::resource_class::ResourceClassRepository;
pub use self::worker::{NewWorker, WorkerRepository};
