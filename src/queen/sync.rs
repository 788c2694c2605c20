//! Statistics synchronization.
//!
//! The `analysis_stats` row of an analysis is a cache over the `job` and
//! `worker` tables. The synchronizer rebuilds it under the per-analysis sync
//! lock: a conditional update claims the lock, persisting the rebuilt row
//! releases it. A coordinator that loses the claim simply skips the pass.

use chrono::Utc;
use entity::analysis_stats::{self, AnalysisStatus};
use entity::job::JobStatus;
use sea_orm::{ActiveValue, IntoActiveModel};

use crate::data::{AnalysisStatsRepository, JobRepository, WorkerRepository};
use crate::error::{Error, LookupError};
use crate::queen::Queen;

/// A WORKING analysis refreshed within this window is considered current and
/// is not re-synced.
const RECENTLY_SYNCED_SECS: i64 = 180;

/// A sync lock older than this is treated as abandoned by a crashed
/// coordinator and may be reclaimed.
const SYNC_LOCK_TTL_SECS: i64 = 600;

/// Sample size for the rolling average job runtime.
const AVG_RUNTIME_SAMPLE: u64 = 1000;

/// Outcome of a hive-wide synchronization pass.
#[derive(Debug, Default)]
pub struct HiveSyncReport {
    /// Analyses whose statistics were rebuilt.
    pub analyses_synced: usize,
    /// How many of them ended the pass blocked.
    pub analyses_blocked: usize,
}

/// Job counts of one analysis as rebuilt from the `job` table.
#[derive(Debug, Default, Clone, Copy)]
struct JobCounts {
    total: i64,
    ready: i64,
    semaphored: i64,
    done: i64,
    failed: i64,
}

impl Queen {
    /// Guarded entry point to statistics synchronization.
    ///
    /// Fast-returns the snapshot untouched when the analysis is already
    /// SYNCHING or DONE, when another coordinator holds a live sync lock, or
    /// when a WORKING analysis was refreshed within the last three minutes.
    /// Otherwise attempts to claim the lock; only the claim winner rebuilds.
    pub async fn safe_synchronize_stats(
        &self,
        stats: analysis_stats::Model,
    ) -> Result<analysis_stats::Model, Error> {
        if stats.status == AnalysisStatus::Done {
            return Ok(stats);
        }

        let now = Utc::now().naive_utc();
        let age_secs = stats.when_updated.map(|t| (now - t).num_seconds());
        let lock_expired = stats.sync_lock
            && age_secs.map(|age| age > SYNC_LOCK_TTL_SECS).unwrap_or(false);

        // An expired lock means the coordinator that held it crashed; the
        // SYNCHING/locked guards must not shield it from being reaped.
        if !lock_expired {
            if stats.status == AnalysisStatus::Synching || stats.sync_lock {
                return Ok(stats);
            }

            if stats.status == AnalysisStatus::Working {
                if let Some(age) = age_secs {
                    if age < RECENTLY_SYNCED_SECS {
                        return Ok(stats);
                    }
                }
            }
        }

        let stats_repo = AnalysisStatsRepository::new(&self.db);
        if !stats_repo
            .claim_sync_lock(stats.analysis_id, SYNC_LOCK_TTL_SECS)
            .await?
        {
            return Ok(stats);
        }

        // Claiming the lock overwrote the status with SYNCHING; the rebuild
        // must still honour what the analysis was before the claim.
        self.rebuild_stats(stats.analysis_id, stats.status).await
    }

    /// Rebuilds the statistics row of one analysis and persists it, which
    /// releases the sync lock.
    ///
    /// In trigger mode the live counts are trusted and only
    /// `num_required_workers` is recomputed; otherwise every count is rebuilt
    /// from `SELECT status, COUNT(*) FROM job … GROUP BY status`, the running
    /// workers are recounted from the worker table and the rolling average
    /// job runtime is refreshed.
    pub async fn synchronize_stats(
        &self,
        analysis_id: i32,
    ) -> Result<analysis_stats::Model, Error> {
        let stats_repo = AnalysisStatsRepository::new(&self.db);
        let current = stats_repo
            .fetch(analysis_id)
            .await?
            .ok_or(LookupError::StatsNotFound(analysis_id))?;
        let prior_status = current.status;

        self.rebuild_stats(analysis_id, prior_status).await
    }

    /// The actual rebuild. `prior_status` is the analysis status before any
    /// lock claim overwrote it; BLOCKED stays sticky through a sync.
    async fn rebuild_stats(
        &self,
        analysis_id: i32,
        prior_status: AnalysisStatus,
    ) -> Result<analysis_stats::Model, Error> {
        let stats_repo = AnalysisStatsRepository::new(&self.db);
        let job_repo = JobRepository::new(&self.db);
        let worker_repo = WorkerRepository::new(&self.db);

        let stats = stats_repo
            .fetch(analysis_id)
            .await?
            .ok_or(LookupError::StatsNotFound(analysis_id))?;

        let mut refreshed = stats.clone().into_active_model();

        let (counts, num_running) = if self.use_triggers {
            let counts = JobCounts {
                total: stats.total_job_count,
                ready: stats.ready_job_count,
                semaphored: stats.semaphored_job_count,
                done: stats.done_job_count,
                failed: stats.failed_job_count,
            };
            (counts, stats.num_running_workers)
        } else {
            let mut counts = JobCounts::default();
            for (status, count) in job_repo.count_by_status(analysis_id).await? {
                counts.total += count;
                match status {
                    JobStatus::Ready => counts.ready += count,
                    JobStatus::Semaphored => counts.semaphored += count,
                    JobStatus::Failed => counts.failed += count,
                    JobStatus::Done | JobStatus::PassedOn => counts.done += count,
                    _ => {}
                }
            }

            let num_running = worker_repo.count_running_for_analysis(analysis_id).await? as i32;

            let runtimes = job_repo
                .recent_done_runtimes(analysis_id, AVG_RUNTIME_SAMPLE)
                .await?;
            if !runtimes.is_empty() {
                let avg = runtimes.iter().sum::<i64>() / runtimes.len() as i64;
                refreshed.avg_msec_per_job = ActiveValue::Set(Some(avg));
            }

            refreshed.total_job_count = ActiveValue::Set(counts.total);
            refreshed.ready_job_count = ActiveValue::Set(counts.ready);
            refreshed.semaphored_job_count = ActiveValue::Set(counts.semaphored);
            refreshed.done_job_count = ActiveValue::Set(counts.done);
            refreshed.failed_job_count = ActiveValue::Set(counts.failed);
            refreshed.num_running_workers = ActiveValue::Set(num_running);

            (counts, num_running)
        };

        refreshed.num_required_workers = ActiveValue::Set(required_workers(
            counts.ready,
            stats.batch_size,
            stats.hive_capacity,
            num_running,
        ));

        // A blocked analysis stays blocked until whatever blocked it says
        // otherwise; status derivation only runs for the rest.
        let status = if prior_status == AnalysisStatus::Blocked {
            AnalysisStatus::Blocked
        } else {
            determine_status(counts, stats.failed_job_tolerance, num_running)
        };
        refreshed.status = ActiveValue::Set(status);

        refreshed.sync_lock = ActiveValue::Set(false);
        refreshed.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));

        Ok(stats_repo.update(refreshed).await?)
    }

    /// Synchronizes every analysis (or just one), regardless of locks held by
    /// nobody — this is the explicit, operator-driven full rebuild.
    pub async fn synchronize_hive(
        &self,
        analysis_filter: Option<i32>,
    ) -> Result<HiveSyncReport, Error> {
        let stats_repo = AnalysisStatsRepository::new(&self.db);

        let all_stats = match analysis_filter {
            Some(analysis_id) => {
                let stats = stats_repo
                    .fetch(analysis_id)
                    .await?
                    .ok_or(LookupError::StatsNotFound(analysis_id))?;
                vec![stats]
            }
            None => stats_repo.fetch_all().await?,
        };

        let mut report = HiveSyncReport::default();
        let mut progress = String::with_capacity(all_stats.len());

        for stats in all_stats {
            let synced = self.synchronize_stats(stats.analysis_id).await?;
            report.analyses_synced += 1;
            if synced.status == AnalysisStatus::Blocked {
                report.analyses_blocked += 1;
                progress.push('x');
            } else {
                progress.push('o');
            }
        }

        tracing::info!(progress = %progress, "synchronized hive");

        Ok(report)
    }

    /// Current hive load: `Σ 1/hive_capacity` over live workers on
    /// capacity-bounded analyses. 0.0 when nothing runs, 1.0 is "full".
    pub async fn get_hive_current_load(&self) -> Result<f64, Error> {
        Ok(WorkerRepository::new(&self.db).hive_current_load().await?)
    }

    /// Counts analyses currently FAILED, optionally restricted to one
    /// analysis id.
    pub async fn count_failed_analyses(
        &self,
        analysis_filter: Option<i32>,
    ) -> Result<u64, Error> {
        Ok(AnalysisStatsRepository::new(&self.db)
            .count_failed(analysis_filter)
            .await?)
    }
}

/// Workers an analysis still needs: `ceil(ready / batch_size)`, clamped by
/// the capacity left unfulfilled by already-running workers. A capacity of 0
/// disables the analysis outright; no capacity means no clamp. Never
/// negative.
fn required_workers(
    ready_job_count: i64,
    batch_size: i32,
    hive_capacity: Option<i32>,
    num_running_workers: i32,
) -> i32 {
    if hive_capacity == Some(0) {
        return 0;
    }

    let batch_size = i64::from(batch_size.max(1));
    let mut required = (ready_job_count + batch_size - 1) / batch_size;

    if let Some(capacity) = hive_capacity {
        let unfulfilled = i64::from(capacity) - i64::from(num_running_workers);
        if unfulfilled < required {
            required = unfulfilled.max(0);
        }
    }

    required.min(i64::from(i32::MAX)) as i32
}

/// Derives READY/WORKING/ALL_CLAIMED/DONE/FAILED from rebuilt job counts.
/// BLOCKED is handled by the caller; it never comes out of here.
fn determine_status(
    counts: JobCounts,
    failed_job_tolerance: i32,
    num_running_workers: i32,
) -> AnalysisStatus {
    if counts.total == 0 {
        return AnalysisStatus::Ready;
    }

    let finished = counts.done + counts.failed;
    if counts.ready == 0 && counts.semaphored == 0 && finished >= counts.total {
        return if counts.failed * 100 > i64::from(failed_job_tolerance) * counts.total {
            AnalysisStatus::Failed
        } else {
            AnalysisStatus::Done
        };
    }

    if counts.ready == 0 {
        return AnalysisStatus::AllClaimed;
    }

    if num_running_workers > 0 {
        AnalysisStatus::Working
    } else {
        AnalysisStatus::Ready
    }
}
