//! A scripted meadow driver.
//!
//! Tests preload the process table, post-mortem causes, pending counts and
//! slot limits; the garbage collector and scheduler then run against it
//! exactly as they would against a real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use apiary::error::MeadowError;
use apiary::meadow::{Meadow, ProcessStatus};
use async_trait::async_trait;
use entity::worker::CauseOfDeath;

/// Meadow driver with entirely scripted answers.
pub struct MockMeadow {
    meadow_type: String,
    name: String,
    reachable: bool,
    post_mortem: bool,
    statuses: HashMap<String, ProcessStatus>,
    causes: HashMap<String, CauseOfDeath>,
    pending: HashMap<String, i64>,
    slots: Option<i64>,
    submissions: Mutex<Vec<(String, u64)>>,
}

impl MockMeadow {
    /// A reachable meadow of the given type with an empty process table.
    pub fn new(meadow_type: impl Into<String>) -> Self {
        Self {
            meadow_type: meadow_type.into(),
            name: "mock".to_string(),
            reachable: true,
            post_mortem: false,
            statuses: HashMap::new(),
            causes: HashMap::new(),
            pending: HashMap::new(),
            slots: None,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Scripts one live process.
    pub fn with_process(mut self, process_id: impl Into<String>, status: ProcessStatus) -> Self {
        self.statuses.insert(process_id.into(), status);
        self
    }

    /// Scripts a post-mortem cause and enables the capability.
    pub fn with_cause(mut self, process_id: impl Into<String>, cause: CauseOfDeath) -> Self {
        self.post_mortem = true;
        self.causes.insert(process_id.into(), cause);
        self
    }

    /// Enables post-mortem lookups without scripting any cause.
    pub fn with_post_mortem(mut self) -> Self {
        self.post_mortem = true;
        self
    }

    /// Scripts pending workers for a resource class.
    pub fn with_pending(mut self, resource_class_name: impl Into<String>, count: i64) -> Self {
        self.pending.insert(resource_class_name.into(), count);
        self
    }

    /// Scripts a finite slot limit.
    pub fn with_slots(mut self, slots: i64) -> Self {
        self.slots = Some(slots);
        self
    }

    /// Makes every status query fail, as if the backend were down.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Submissions recorded so far, in call order.
    pub fn submissions(&self) -> Vec<(String, u64)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Meadow for MockMeadow {
    fn meadow_type(&self) -> &str {
        &self.meadow_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn status_of_all_our_workers(
        &self,
    ) -> Result<HashMap<String, ProcessStatus>, MeadowError> {
        if !self.reachable {
            return Err(MeadowError::Unreachable {
                meadow_type: self.meadow_type.clone(),
                message: "scripted as unreachable".to_string(),
            });
        }

        Ok(self.statuses.clone())
    }

    fn supports_post_mortem(&self) -> bool {
        self.post_mortem
    }

    async fn find_out_causes(
        &self,
        process_ids: &[String],
    ) -> Result<HashMap<String, CauseOfDeath>, MeadowError> {
        if !self.post_mortem {
            return Err(MeadowError::UnsupportedCapability {
                meadow_type: self.meadow_type.clone(),
                capability: "post-mortem cause lookup",
            });
        }

        Ok(process_ids
            .iter()
            .filter_map(|pid| self.causes.get(pid).map(|cause| (pid.clone(), *cause)))
            .collect())
    }

    async fn submit_workers(
        &self,
        resource_class_name: &str,
        count: u64,
    ) -> Result<(), MeadowError> {
        self.submissions
            .lock()
            .unwrap()
            .push((resource_class_name.to_string(), count));

        Ok(())
    }

    async fn pending_worker_counts(&self) -> Result<HashMap<String, i64>, MeadowError> {
        Ok(self.pending.clone())
    }

    async fn available_worker_slots(&self) -> Result<Option<i64>, MeadowError> {
        Ok(self.slots)
    }
}
