//! The LOCAL meadow: workers as plain processes on this host.
//!
//! Process liveness comes from a sysinfo snapshot of the process table;
//! there is no queue, so nothing is ever pending, and no post-mortem source
//! exists. Slot accounting is a configured capacity minus the processes
//! currently seen.

use std::collections::HashMap;

use async_trait::async_trait;
use sysinfo::System;
use tokio::process::Command;

use crate::error::MeadowError;
use crate::meadow::{Meadow, ProcessStatus};

/// Driver for worker processes on the local host.
pub struct LocalMeadow {
    name: String,
    total_slots: i64,
    /// Command line used to spawn one worker; empty disables submission.
    worker_command: Vec<String>,
    /// Substring identifying our workers in the process table.
    process_marker: String,
}

impl LocalMeadow {
    /// Creates a local meadow.
    ///
    /// # Arguments
    /// - `name` - Instance name, conventionally the hostname
    /// - `total_slots` - Workers this host is allowed to run at once
    /// - `worker_command` - Command line spawned per submitted worker; its
    ///   first element doubles as the process-table marker
    pub fn new(name: impl Into<String>, total_slots: i64, worker_command: Vec<String>) -> Self {
        let process_marker = worker_command.first().cloned().unwrap_or_default();

        Self {
            name: name.into(),
            total_slots,
            worker_command,
            process_marker,
        }
    }

    fn process_table(&self) -> HashMap<String, ProcessStatus> {
        let mut system = System::new();
        system.refresh_processes();

        system
            .processes()
            .iter()
            .filter(|(_, process)| command_matches(process.cmd(), &self.process_marker))
            .map(|(pid, process)| {
                (
                    pid.as_u32().to_string(),
                    worker_process_status(process.status()),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Meadow for LocalMeadow {
    fn meadow_type(&self) -> &str {
        "LOCAL"
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn status_of_all_our_workers(
        &self,
    ) -> Result<HashMap<String, ProcessStatus>, MeadowError> {
        if self.process_marker.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(self.process_table())
    }

    async fn submit_workers(
        &self,
        resource_class_name: &str,
        count: u64,
    ) -> Result<(), MeadowError> {
        let Some((program, args)) = self.worker_command.split_first() else {
            return Err(MeadowError::Submission {
                meadow_type: self.meadow_type().to_string(),
                message: "no worker command configured".to_string(),
            });
        };

        for _ in 0..count {
            Command::new(program)
                .args(args)
                .env("HIVE_RESOURCE_CLASS", resource_class_name)
                .spawn()
                .map_err(|error| MeadowError::Submission {
                    meadow_type: self.meadow_type().to_string(),
                    message: error.to_string(),
                })?;
        }

        Ok(())
    }

    async fn pending_worker_counts(&self) -> Result<HashMap<String, i64>, MeadowError> {
        // Local processes start immediately; nothing queues.
        Ok(HashMap::new())
    }

    async fn available_worker_slots(&self) -> Result<Option<i64>, MeadowError> {
        let running = if self.process_marker.is_empty() {
            0
        } else {
            self.process_table().len() as i64
        };

        Ok(Some((self.total_slots - running).max(0)))
    }
}

/// Whether a process command line belongs to one of our workers.
fn command_matches(cmd: &[String], marker: &str) -> bool {
    !marker.is_empty() && cmd.iter().any(|arg| arg.contains(marker))
}

/// Maps a sysinfo process state onto the driver contract: stopped processes
/// are suspended, everything else alive counts as running.
fn worker_process_status(status: sysinfo::ProcessStatus) -> ProcessStatus {
    match status {
        sysinfo::ProcessStatus::Stop => ProcessStatus::Suspended,
        _ => ProcessStatus::Running,
    }
}
