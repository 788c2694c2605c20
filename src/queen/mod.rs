//! The queen: the coordinator at the centre of the hive.
//!
//! Split by concern the way the work splits operationally:
//! - [`lifecycle`] — worker birth, specialization, check-ins, death and the
//!   dead-worker garbage collector.
//! - [`sync`] — rebuilding `analysis_stats` aggregates from the ground-truth
//!   `job`/`worker` tables under the per-analysis sync lock.
//! - [`scheduler`] — deciding how many workers of which resource class to
//!   submit to which meadow.
//!
//! Several queens (one per beekeeper process) may drive the same hive
//! concurrently; they coordinate exclusively through the database.

pub mod lifecycle;
pub mod scheduler;
pub mod sync;

use sea_orm::DatabaseConnection;

pub use self::lifecycle::{
    DeadWorkerSweep, ResourceClassSelector, Specialization, SpecializationTarget,
    WorkerRegistration,
};
pub use self::scheduler::{PendingLedger, SchedulingContext, WorkerPlan};
pub use self::sync::HiveSyncReport;

/// The coordinator. Holds the database handle every operation runs against.
///
/// In-memory state never outlives a single decision: statistics are refreshed
/// from their rows before anything depends on their counts.
pub struct Queen {
    db: DatabaseConnection,
    use_triggers: bool,
}

impl Queen {
    /// Creates a queen for a hive whose aggregate counts are rebuilt by the
    /// synchronizer (the default).
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            use_triggers: false,
        }
    }

    /// Creates a queen for a hive where database triggers maintain the live
    /// job counts; synchronization then only recomputes required workers.
    pub fn with_triggers(db: DatabaseConnection) -> Self {
        Self {
            db,
            use_triggers: true,
        }
    }

    /// The database handle this queen operates on.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
