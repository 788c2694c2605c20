//! Specialization conflicts: reasons the queen refuses to bind a freshly
//! created worker to an analysis or job.
//!
//! Each rejection maps to the `cause_of_death` the refused worker is expected
//! to record before exiting; the queen itself never kills the process.

use entity::job::JobStatus;
use entity::worker::CauseOfDeath;
use thiserror::Error;

/// Why `specialize_new_worker` refused the binding.
#[derive(Error, Debug)]
pub enum SpecializationError {
    /// The hive is already over its load ceiling.
    #[error("hive load {load:.2} is at or above the overload ceiling, refusing new workers")]
    HiveOverloaded {
        /// Current hive load at the time of refusal (1.0 is "full").
        load: f64,
    },
    /// The target analysis is blocked.
    #[error("analysis '{logic_name}' is blocked")]
    AnalysisBlocked {
        /// Logic name of the blocked analysis.
        logic_name: String,
    },
    /// The target analysis does not need any more workers right now.
    #[error("analysis '{logic_name}' requires no more workers")]
    NoWorkersRequired {
        /// Logic name of the saturated analysis.
        logic_name: String,
    },
    /// The target analysis has already finished.
    #[error("analysis '{logic_name}' is done")]
    AnalysisDone {
        /// Logic name of the finished analysis.
        logic_name: String,
    },
    /// The worker was submitted under a different resource class than the
    /// analysis demands.
    #[error(
        "worker resource class {worker_resource_class_id} does not match \
         resource class {analysis_resource_class_id} of analysis '{logic_name}'"
    )]
    ResourceClassMismatch {
        /// Resource class the worker was created with.
        worker_resource_class_id: i32,
        /// Resource class the analysis requires.
        analysis_resource_class_id: i32,
        /// Logic name of the targeted analysis.
        logic_name: String,
    },
    /// The targeted job is being executed by another worker.
    #[error("job {job_id} is {status:?} and cannot be taken over")]
    JobAlreadyInFlight {
        /// Id of the contested job.
        job_id: i64,
        /// Status that made the job untouchable.
        status: JobStatus,
    },
    /// The targeted job is DONE or SEMAPHORED and `force` was not given.
    #[error("job {job_id} is {status:?}; re-running it requires force")]
    JobNotResettable {
        /// Id of the protected job.
        job_id: i64,
        /// Terminal or gated status of the job.
        status: JobStatus,
    },
    /// No analysis currently suits the worker's resource class.
    #[error("no analysis currently suits resource class {resource_class_id}")]
    NoSuitableAnalysis {
        /// Resource class the scheduler searched for.
        resource_class_id: i32,
    },
}

impl SpecializationError {
    /// The cause of death a worker refused for this reason should die with.
    pub fn cause_of_death(&self) -> CauseOfDeath {
        match self {
            Self::HiveOverloaded { .. } => CauseOfDeath::HiveOverload,
            Self::AnalysisBlocked { .. }
            | Self::NoWorkersRequired { .. }
            | Self::AnalysisDone { .. }
            | Self::NoSuitableAnalysis { .. } => CauseOfDeath::NoWork,
            Self::ResourceClassMismatch { .. }
            | Self::JobAlreadyInFlight { .. }
            | Self::JobNotResettable { .. } => CauseOfDeath::SeeMsg,
        }
    }
}
