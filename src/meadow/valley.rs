//! The valley: every meadow one beekeeper can see.

use std::collections::HashMap;
use std::sync::Arc;

use entity::worker;

use crate::meadow::Meadow;

/// Default hive-wide cap on workers submitted per scheduling pass.
const DEFAULT_SUBMIT_WORKERS_MAX: i64 = 50;

/// Federation of meadow drivers, keyed by meadow type.
///
/// Aggregate queries swallow per-meadow failures: a meadow that does not
/// answer simply contributes nothing, and its workers are treated as
/// unreachable rather than dead.
pub struct Valley {
    meadows: HashMap<String, Arc<dyn Meadow>>,
    default_meadow_type: String,
    submit_workers_max: i64,
}

impl Valley {
    /// Creates a valley with one meadow, which becomes the default.
    pub fn new(default_meadow: Arc<dyn Meadow>) -> Self {
        let default_meadow_type = default_meadow.meadow_type().to_string();
        let mut meadows: HashMap<String, Arc<dyn Meadow>> = HashMap::new();
        meadows.insert(default_meadow_type.clone(), default_meadow);

        Self {
            meadows,
            default_meadow_type,
            submit_workers_max: DEFAULT_SUBMIT_WORKERS_MAX,
        }
    }

    /// Registers an additional meadow; replaces any driver of the same type.
    pub fn register(&mut self, meadow: Arc<dyn Meadow>) {
        self.meadows.insert(meadow.meadow_type().to_string(), meadow);
    }

    /// Overrides the per-pass submission cap.
    pub fn with_submit_workers_max(mut self, submit_workers_max: i64) -> Self {
        self.submit_workers_max = submit_workers_max;
        self
    }

    /// Hive-wide cap on workers submitted in one scheduling pass.
    pub fn submit_workers_max(&self) -> i64 {
        self.submit_workers_max
    }

    /// Meadow type used when an analysis does not pin one.
    pub fn default_meadow_type(&self) -> &str {
        &self.default_meadow_type
    }

    /// The default meadow driver.
    pub fn default_meadow(&self) -> &Arc<dyn Meadow> {
        &self.meadows[&self.default_meadow_type]
    }

    /// The driver responsible for a meadow type, if this valley has one.
    pub fn meadow(&self, meadow_type: &str) -> Option<&Arc<dyn Meadow>> {
        self.meadows.get(meadow_type)
    }

    /// All registered meadows.
    pub fn available_meadows(&self) -> impl Iterator<Item = &Arc<dyn Meadow>> {
        self.meadows.values()
    }

    /// The meadow a given worker lives on, matched by type and instance name.
    pub fn meadow_for_worker(&self, worker: &worker::Model) -> Option<&Arc<dyn Meadow>> {
        self.meadows
            .get(&worker.meadow_type)
            .filter(|meadow| meadow.name() == worker.meadow_name)
    }

    /// Free worker slots per meadow type. Meadows that fail to answer are
    /// left out.
    pub async fn available_worker_slots_by_meadow_type(
        &self,
    ) -> HashMap<String, Option<i64>> {
        let mut slots = HashMap::new();

        for (meadow_type, meadow) in &self.meadows {
            match meadow.available_worker_slots().await {
                Ok(available) => {
                    slots.insert(meadow_type.clone(), available);
                }
                Err(error) => {
                    tracing::warn!(
                        meadow_type = %meadow_type,
                        error = %error,
                        "meadow did not report its worker slots"
                    );
                }
            }
        }

        slots
    }

    /// Pending-worker counts per meadow type and resource class name.
    /// Meadows that fail to answer are left out.
    pub async fn pending_worker_counts_by_meadow_type_rc_name(
        &self,
    ) -> HashMap<String, HashMap<String, i64>> {
        let mut pending = HashMap::new();

        for (meadow_type, meadow) in &self.meadows {
            match meadow.pending_worker_counts().await {
                Ok(counts) => {
                    pending.insert(meadow_type.clone(), counts);
                }
                Err(error) => {
                    tracing::warn!(
                        meadow_type = %meadow_type,
                        error = %error,
                        "meadow did not report its pending workers"
                    );
                }
            }
        }

        pending
    }
}
