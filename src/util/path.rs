//! Worker log-directory layout.

use std::path::{Path, PathBuf};

/// Per-worker log directory under a fanned-out base.
///
/// Workers are grouped a thousand per subdirectory so a hive that spawned
/// millions of workers never puts millions of siblings into one directory.
pub fn fanned_log_dir(base: &Path, worker_id: i64) -> PathBuf {
    let group = worker_id / 1000;
    base.join(format!("worker_group_{group}"))
        .join(format!("worker_{worker_id}"))
}
