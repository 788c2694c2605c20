//! The worker-submission scheduler.
//!
//! One pass walks the candidate analyses in suitability order and hands out
//! submission counts per (meadow type, resource class name) from three
//! shrinking budgets: the caller's submit limit, the hive load headroom and
//! each meadow's free slots. Workers already pending in a meadow's queue are
//! deducted so repeated passes do not pile up submissions. The first analysis
//! reached exhausts its allowance before the next is considered; fairness is
//! expected to emerge across repeated rounds, not within one.

use std::collections::{BTreeMap, HashMap};

use entity::analysis_stats::AnalysisStatus;
use serde::Serialize;

use crate::data::{AnalysisRepository, AnalysisStatsRepository, ResourceClassRepository, WorkerRepository};
use crate::error::{Error, LookupError};
use crate::meadow::Valley;
use crate::queen::Queen;

/// Pending-worker counts per meadow type and resource class name. The
/// scheduler decrements entries as it accounts for them, so the caller can
/// observe what is still considered queued after a pass.
pub type PendingLedger = HashMap<String, HashMap<String, i64>>;

/// Inputs of one scheduling pass that come from outside the database.
pub struct SchedulingContext {
    /// Hard cap on workers submitted in this pass, across all meadows.
    pub submit_limit: i64,
    /// Free slots per meadow type; `None` means unlimited.
    pub slots_by_meadow: HashMap<String, Option<i64>>,
    /// Meadow type used by analyses that do not pin one.
    pub default_meadow_type: String,
}

/// What one scheduling pass decided to submit.
#[derive(Debug, Default, Serialize)]
pub struct WorkerPlan {
    /// meadow type → resource class name → workers to submit.
    pub submissions: BTreeMap<String, BTreeMap<String, i64>>,
    /// Total workers across all submissions.
    pub total_workers: i64,
}

impl Queen {
    /// Computes how many workers to submit per (meadow type, resource class).
    ///
    /// Candidates are all analyses in suitability order, or a single one when
    /// `analysis_filter` is given; the ordering comes from the repository and
    /// is never re-sorted here. Analyses that look stale (LOADING, BLOCKED,
    /// ALL_CLAIMED) are safe-synced before being judged. `pending` is
    /// decremented by every recorded submission so a following analysis on
    /// the same resource class cannot double-subtract.
    pub async fn schedule_workers(
        &self,
        analysis_filter: Option<i32>,
        context: &SchedulingContext,
        pending: &mut PendingLedger,
    ) -> Result<WorkerPlan, Error> {
        let analysis_repo = AnalysisRepository::new(&self.db);
        let stats_repo = AnalysisStatsRepository::new(&self.db);
        let resource_class_repo = ResourceClassRepository::new(&self.db);

        let resource_class_names: HashMap<i32, String> = resource_class_repo
            .fetch_all()
            .await?
            .into_iter()
            .map(|rc| (rc.resource_class_id, rc.name))
            .collect();

        let candidates = match analysis_filter {
            Some(analysis_id) => {
                let analysis = analysis_repo
                    .fetch_by_id(analysis_id)
                    .await?
                    .ok_or(LookupError::AnalysisNotFound(analysis_id))?;
                let stats = stats_repo
                    .fetch(analysis_id)
                    .await?
                    .ok_or(LookupError::StatsNotFound(analysis_id))?;
                vec![(analysis, stats)]
            }
            None => analysis_repo.fetch_all_by_suitability(None).await?,
        };

        let mut plan = WorkerPlan::default();
        let mut available_load = 1.0 - self.get_hive_current_load().await?;
        let mut submit_limit = context.submit_limit;
        let mut slots_by_meadow = context.slots_by_meadow.clone();

        for (analysis, stats) in candidates {
            if available_load <= 0.0 {
                break;
            }

            let meadow_type = analysis
                .meadow_type
                .clone()
                .unwrap_or_else(|| context.default_meadow_type.clone());

            let Some(meadow_slots) = slots_by_meadow.get(&meadow_type).copied() else {
                tracing::warn!(
                    logic_name = %analysis.logic_name,
                    meadow_type = %meadow_type,
                    "analysis pinned to a meadow that reported no slots, skipping"
                );
                continue;
            };

            let effective_limit = match meadow_slots {
                Some(slots) => submit_limit.min(slots),
                None => submit_limit,
            };
            if effective_limit <= 0 {
                break;
            }

            let mut stats = stats;
            if matches!(
                stats.status,
                AnalysisStatus::Loading | AnalysisStatus::Blocked | AnalysisStatus::AllClaimed
            ) {
                stats = self.safe_synchronize_stats(stats).await?;
            }
            if stats.status == AnalysisStatus::Blocked {
                continue;
            }

            let mut workers = i64::from(stats.num_required_workers);
            if workers <= 0 {
                continue;
            }

            workers = workers.min(effective_limit);
            submit_limit -= workers;
            if let Some(Some(slots)) = slots_by_meadow.get_mut(&meadow_type) {
                *slots -= workers;
            }

            if let Some(capacity) = stats.hive_capacity.filter(|c| *c > 0) {
                let share = (available_load * f64::from(capacity)).floor() as i64;
                workers = workers.min(share);
                if workers <= 0 {
                    continue;
                }
                available_load -= workers as f64 / f64::from(capacity);
            }

            let resource_class_name = resource_class_names
                .get(&analysis.resource_class_id)
                .cloned()
                .ok_or_else(|| {
                    LookupError::ResourceClassNotFound(analysis.resource_class_id.to_string())
                })?;

            if let Some(pending_here) = pending
                .get_mut(&meadow_type)
                .and_then(|by_rc| by_rc.get_mut(&resource_class_name))
            {
                workers = deduct_pending(workers, pending_here);
            }
            if workers <= 0 {
                continue;
            }

            *plan
                .submissions
                .entry(meadow_type)
                .or_default()
                .entry(resource_class_name)
                .or_default() += workers;
            plan.total_workers += workers;
        }

        tracing::debug!(
            plan = %serde_json::to_string(&plan).unwrap_or_default(),
            "scheduling pass computed"
        );

        Ok(plan)
    }

    /// Schedules workers, breaking the stale-statistics deadlock if needed.
    ///
    /// When the pass comes back empty while the hive carries no load and not
    /// a single worker row is alive, the system looks idle yet jobs remain —
    /// usually because stale counts make every analysis look satisfied. One
    /// garbage-collection sweep (with the buried-in-haste pass) and a full
    /// resync later, the schedule is recomputed once.
    pub async fn schedule_workers_resync_if_necessary(
        &self,
        valley: &Valley,
        analysis_filter: Option<i32>,
    ) -> Result<WorkerPlan, Error> {
        let context = SchedulingContext {
            submit_limit: valley.submit_workers_max(),
            slots_by_meadow: valley.available_worker_slots_by_meadow_type().await,
            default_meadow_type: valley.default_meadow_type().to_string(),
        };

        let mut pending = valley.pending_worker_counts_by_meadow_type_rc_name().await;
        let plan = self
            .schedule_workers(analysis_filter, &context, &mut pending)
            .await?;

        if plan.total_workers > 0 {
            return Ok(plan);
        }

        let load = self.get_hive_current_load().await?;
        let live_workers = WorkerRepository::new(&self.db).count_non_dead().await?;
        if load > 0.0 || live_workers > 0 {
            return Ok(plan);
        }

        tracing::info!("hive looks idle but may be out of sync, collecting the dead and resyncing");

        self.check_for_dead_workers(valley, true).await?;
        self.synchronize_hive(analysis_filter).await?;

        let mut pending = valley.pending_worker_counts_by_meadow_type_rc_name().await;
        self.schedule_workers(analysis_filter, &context, &mut pending)
            .await
    }
}

/// Deducts queued workers from a submission and charges the ledger with what
/// will actually be submitted, clamping both at zero.
fn deduct_pending(workers: i64, pending: &mut i64) -> i64 {
    let to_submit = (workers - *pending).max(0);
    *pending = (*pending - to_submit).max(0);
    to_submit
}
