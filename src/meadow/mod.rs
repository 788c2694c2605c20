//! Compute backends ("meadows") and their federation.
//!
//! A meadow is anything that can run worker processes: a batch system like
//! LSF, or the local host. Drivers differ in what they can answer, so the
//! contract separates the mandatory operations from optional capabilities
//! guarded by explicit `supports_*` predicates — the garbage collector must
//! never call `find_out_causes` on a driver that cannot deliver it.

pub mod local;
pub mod valley;

use std::collections::HashMap;

use async_trait::async_trait;
use entity::worker::CauseOfDeath;

use crate::error::MeadowError;

pub use self::local::LocalMeadow;
pub use self::valley::Valley;

/// Live state of one worker process as reported by its meadow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Executing.
    Running,
    /// Queued, not yet started.
    Pending,
    /// Stopped but resumable.
    Suspended,
}

/// The per-backend driver contract.
///
/// Every call may block on an external system; drivers are expected to apply
/// their own timeouts so scheduling cycles stay bounded.
#[async_trait]
pub trait Meadow: Send + Sync {
    /// Backend type this driver speaks for (e.g. "LSF", "LOCAL").
    fn meadow_type(&self) -> &str;

    /// Name of this concrete meadow instance.
    fn name(&self) -> &str;

    /// Live process map of all workers this meadow currently knows about,
    /// keyed by process id.
    async fn status_of_all_our_workers(
        &self,
    ) -> Result<HashMap<String, ProcessStatus>, MeadowError>;

    /// Whether [`Meadow::find_out_causes`] can deliver post-mortem causes.
    fn supports_post_mortem(&self) -> bool {
        false
    }

    /// Post-mortem causes of death for vanished processes. Only valid on
    /// drivers that report [`Meadow::supports_post_mortem`].
    async fn find_out_causes(
        &self,
        _process_ids: &[String],
    ) -> Result<HashMap<String, CauseOfDeath>, MeadowError> {
        Err(MeadowError::UnsupportedCapability {
            meadow_type: self.meadow_type().to_string(),
            capability: "post-mortem cause lookup",
        })
    }

    /// Submits `count` workers under the given resource class.
    async fn submit_workers(
        &self,
        resource_class_name: &str,
        count: u64,
    ) -> Result<(), MeadowError>;

    /// Workers submitted but not yet running, per resource class name.
    async fn pending_worker_counts(&self) -> Result<HashMap<String, i64>, MeadowError>;

    /// Free worker slots on this meadow; `None` means unlimited.
    async fn available_worker_slots(&self) -> Result<Option<i64>, MeadowError>;
}
