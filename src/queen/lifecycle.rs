//! Worker lifecycle: birth, specialization, check-ins, death and the
//! dead-worker garbage collector.
//!
//! The queen creates worker rows before the processes start doing anything
//! useful, binds each to exactly one analysis, and registers their deaths —
//! voluntary or discovered. Workers pull jobs themselves; nothing here pushes
//! work at them.

use std::collections::HashMap;
use std::path::PathBuf;

use entity::analysis_stats::AnalysisStatus;
use entity::job::{self, JobStatus};
use entity::worker::{self, CauseOfDeath, WorkerStatus};
use entity::{analysis, analysis_stats};

use crate::data::{
    AnalysisRepository, AnalysisStatsRepository, JobRepository, NewWorker, ResourceClassRepository,
    WorkerRepository,
};
use crate::error::{Error, LookupError, SpecializationError};
use crate::meadow::Valley;
use crate::queen::Queen;
use crate::util::path::fanned_log_dir;

/// Hive load at or above which specialization is refused outright.
const OVERLOAD_CEILING: f64 = 1.1;

/// Causes of death after which the dead worker's in-flight jobs are released
/// back to READY. The self-inflicted causes (NO_WORK, JOB_LIMIT, LIFESPAN,
/// HIVE_OVERLOAD) mean the worker wound down cleanly and left nothing behind.
const RECLAIM_CAUSES: [CauseOfDeath; 6] = [
    CauseOfDeath::Unknown,
    CauseOfDeath::Memlimit,
    CauseOfDeath::Runlimit,
    CauseOfDeath::KilledByUser,
    CauseOfDeath::SeeMsg,
    CauseOfDeath::Contaminated,
];

/// How the resource class of a new worker is identified.
pub enum ResourceClassSelector {
    /// By database id.
    Id(i32),
    /// By unique name; an unknown name is fatal to worker creation.
    Name(String),
}

/// Identity of a freshly spawned worker process, as reported at birth.
pub struct WorkerRegistration {
    /// Type of the meadow the process runs on.
    pub meadow_type: String,
    /// Name of the concrete meadow instance.
    pub meadow_name: String,
    /// Host the process landed on.
    pub host: String,
    /// Backend-specific process identifier.
    pub process_id: String,
    /// Resource class the process was submitted under.
    pub resource_class: ResourceClassSelector,
    /// When set, a per-worker log directory is created under this base and
    /// recorded on the row.
    pub log_base_dir: Option<PathBuf>,
}

/// What a new worker should bind itself to.
///
/// The variants are mutually exclusive by construction; there is no way to
/// ask for an analysis and a job at the same time.
pub enum SpecializationTarget {
    /// Let the queen pick the most suitable analysis for the worker's
    /// resource class.
    Automatic,
    /// A specific analysis by id.
    Analysis(i32),
    /// A specific analysis by logic name.
    LogicName(String),
    /// A specific job; the analysis is derived from it.
    Job(i64),
}

/// Outcome of a successful specialization.
pub enum Specialization {
    /// The worker joined the analysis' regular workforce and will claim jobs
    /// in batches.
    Scheduled {
        /// Analysis the worker is now bound to.
        analysis_id: i32,
    },
    /// The worker was given one pre-grabbed job outside scheduler accounting.
    SpecialBatch {
        /// The job, already CLAIMED for this worker.
        job: job::Model,
    },
}

/// Summary of one dead-worker garbage collection pass.
#[derive(Debug, Default)]
pub struct DeadWorkerSweep {
    /// Non-dead workers examined.
    pub workers_checked: usize,
    /// Workers whose process had vanished and whose death was registered.
    pub workers_lost: usize,
    /// Workers skipped because their meadow did not answer.
    pub workers_unreachable: usize,
    /// Jobs released from workers that were buried in haste.
    pub jobs_released: u64,
}

impl Queen {
    /// Registers the birth of a worker process.
    ///
    /// Resolves the resource class (an unknown name is fatal), inserts the
    /// row with `born = last_check_in = now`, and — when logging was
    /// requested — creates a hash-fanned per-worker directory under the base
    /// and records it back on the row. Any failure is fatal to the call; no
    /// partial row is left behind usable.
    ///
    /// # Returns
    /// - `Ok(Model)` - The fully populated worker handle
    /// - `Err(Error)` - Lookup miss, insertion failure or log-directory failure
    pub async fn create_new_worker(
        &self,
        registration: WorkerRegistration,
    ) -> Result<worker::Model, Error> {
        let resource_class_repo = ResourceClassRepository::new(&self.db);
        let worker_repo = WorkerRepository::new(&self.db);

        let resource_class = match &registration.resource_class {
            ResourceClassSelector::Id(id) => resource_class_repo
                .fetch_by_id(*id)
                .await?
                .ok_or_else(|| LookupError::ResourceClassNotFound(id.to_string()))?,
            ResourceClassSelector::Name(name) => resource_class_repo
                .fetch_by_name(name)
                .await?
                .ok_or_else(|| LookupError::ResourceClassNotFound(name.clone()))?,
        };

        let mut new_worker = worker_repo
            .insert(NewWorker {
                meadow_type: registration.meadow_type,
                meadow_name: registration.meadow_name,
                host: registration.host,
                process_id: registration.process_id,
                resource_class_id: resource_class.resource_class_id,
            })
            .await?;

        if let Some(base) = &registration.log_base_dir {
            let log_dir = fanned_log_dir(base, new_worker.worker_id);
            tokio::fs::create_dir_all(&log_dir).await?;

            let log_dir = log_dir.to_string_lossy().into_owned();
            worker_repo
                .set_log_dir(new_worker.worker_id, &log_dir)
                .await?;
            new_worker.log_dir = Some(log_dir);
        }

        tracing::info!(
            worker_id = new_worker.worker_id,
            meadow_type = %new_worker.meadow_type,
            process_id = %new_worker.process_id,
            "worker born"
        );

        Ok(new_worker)
    }

    /// Binds a freshly created worker to exactly one analysis.
    ///
    /// A job target grabs that job atomically and returns it as a special
    /// batch outside scheduler accounting; an analysis target (explicit or
    /// chosen automatically) joins the regular workforce after passing the
    /// overload, blocking and demand checks. Every rejection carries the
    /// `cause_of_death` the refused worker is expected to die with.
    pub async fn specialize_new_worker(
        &self,
        new_worker: &worker::Model,
        target: SpecializationTarget,
        force: bool,
    ) -> Result<Specialization, Error> {
        let analysis_repo = AnalysisRepository::new(&self.db);

        match target {
            SpecializationTarget::Job(job_id) => self.specialize_to_job(new_worker, job_id, force).await,
            SpecializationTarget::Analysis(analysis_id) => {
                let analysis = analysis_repo
                    .fetch_by_id(analysis_id)
                    .await?
                    .ok_or(LookupError::AnalysisNotFound(analysis_id))?;
                self.specialize_to_analysis(new_worker, &analysis, force)
                    .await
            }
            SpecializationTarget::LogicName(logic_name) => {
                let analysis = analysis_repo
                    .fetch_by_logic_name(&logic_name)
                    .await?
                    .ok_or(LookupError::LogicNameNotFound(logic_name))?;
                self.specialize_to_analysis(new_worker, &analysis, force)
                    .await
            }
            SpecializationTarget::Automatic => {
                let (analysis, _) = self
                    .suggest_analysis_to_specialize(new_worker.resource_class_id)
                    .await?
                    .ok_or(SpecializationError::NoSuitableAnalysis {
                        resource_class_id: new_worker.resource_class_id,
                    })?;
                self.finalize_scheduled(new_worker, analysis.analysis_id)
                    .await
            }
        }
    }

    /// The first analysis, in suitability order for this resource class,
    /// whose freshly synced statistics are not blocked and still require
    /// workers.
    pub async fn suggest_analysis_to_specialize(
        &self,
        resource_class_id: i32,
    ) -> Result<Option<(analysis::Model, analysis_stats::Model)>, Error> {
        let candidates = AnalysisRepository::new(&self.db)
            .fetch_all_by_suitability(Some(resource_class_id))
            .await?;

        for (analysis, stats) in candidates {
            let stats = self.safe_synchronize_stats(stats).await?;
            if stats.status != AnalysisStatus::Blocked && stats.num_required_workers > 0 {
                return Ok(Some((analysis, stats)));
            }
        }

        Ok(None)
    }

    /// Path A: job-targeted specialization.
    async fn specialize_to_job(
        &self,
        new_worker: &worker::Model,
        job_id: i64,
        force: bool,
    ) -> Result<Specialization, Error> {
        let job_repo = JobRepository::new(&self.db);
        let worker_repo = WorkerRepository::new(&self.db);
        let stats_repo = AnalysisStatsRepository::new(&self.db);

        let job = job_repo
            .fetch_by_id(job_id)
            .await?
            .ok_or(LookupError::JobNotFound(job_id))?;

        if crate::data::job::IN_FLIGHT_JOB_STATUSES.contains(&job.status) {
            return Err(SpecializationError::JobAlreadyInFlight {
                job_id,
                status: job.status,
            }
            .into());
        }

        if matches!(job.status, JobStatus::Done | JobStatus::Semaphored) && !force {
            return Err(SpecializationError::JobNotResettable {
                job_id,
                status: job.status,
            }
            .into());
        }

        // Re-running a DONE job un-does its semaphore decrement first, so the
        // parent stays blocked while this one runs again.
        if job.status == JobStatus::Done {
            if let Some(parent_job_id) = job.semaphored_job_id {
                job_repo.increment_semaphore(parent_job_id).await?;
            }
        }

        if !job_repo.reset_or_grab(job_id, new_worker.worker_id).await? {
            return Err(SpecializationError::JobAlreadyInFlight {
                job_id,
                status: job.status,
            }
            .into());
        }

        worker_repo
            .bind_to_analysis(new_worker.worker_id, job.analysis_id)
            .await?;
        stats_repo.increment_running(job.analysis_id).await?;

        let job = job_repo
            .fetch_by_id(job_id)
            .await?
            .ok_or(LookupError::JobNotFound(job_id))?;

        Ok(Specialization::SpecialBatch { job })
    }

    /// Path B: analysis-targeted specialization.
    async fn specialize_to_analysis(
        &self,
        new_worker: &worker::Model,
        analysis: &analysis::Model,
        force: bool,
    ) -> Result<Specialization, Error> {
        if analysis.resource_class_id != new_worker.resource_class_id {
            return Err(SpecializationError::ResourceClassMismatch {
                worker_resource_class_id: new_worker.resource_class_id,
                analysis_resource_class_id: analysis.resource_class_id,
                logic_name: analysis.logic_name.clone(),
            }
            .into());
        }

        let stats_repo = AnalysisStatsRepository::new(&self.db);
        let stats = stats_repo
            .fetch(analysis.analysis_id)
            .await?
            .ok_or(LookupError::StatsNotFound(analysis.analysis_id))?;
        let stats = self.safe_synchronize_stats(stats).await?;

        if !force {
            let load = self.get_hive_current_load().await?;
            if load >= OVERLOAD_CEILING {
                return Err(SpecializationError::HiveOverloaded { load }.into());
            }
            if stats.status == AnalysisStatus::Blocked {
                return Err(SpecializationError::AnalysisBlocked {
                    logic_name: analysis.logic_name.clone(),
                }
                .into());
            }
            if stats.num_required_workers <= 0 {
                return Err(SpecializationError::NoWorkersRequired {
                    logic_name: analysis.logic_name.clone(),
                }
                .into());
            }
            if stats.status == AnalysisStatus::Done {
                return Err(SpecializationError::AnalysisDone {
                    logic_name: analysis.logic_name.clone(),
                }
                .into());
            }
        }

        self.finalize_scheduled(new_worker, analysis.analysis_id)
            .await
    }

    /// Persists a scheduled (non-special-batch) binding and its accounting.
    async fn finalize_scheduled(
        &self,
        new_worker: &worker::Model,
        analysis_id: i32,
    ) -> Result<Specialization, Error> {
        let worker_repo = WorkerRepository::new(&self.db);
        let stats_repo = AnalysisStatsRepository::new(&self.db);

        worker_repo
            .bind_to_analysis(new_worker.worker_id, analysis_id)
            .await?;
        stats_repo
            .set_status(analysis_id, AnalysisStatus::Working)
            .await?;
        stats_repo.decrement_required(analysis_id).await?;
        stats_repo.increment_running(analysis_id).await?;

        tracing::info!(
            worker_id = new_worker.worker_id,
            analysis_id,
            "worker specialized"
        );

        Ok(Specialization::Scheduled { analysis_id })
    }

    /// Records a worker check-in: `last_check_in = now`, current status and
    /// work counter. Idempotent, returns nothing.
    pub async fn check_in_worker(
        &self,
        worker_id: i64,
        status: WorkerStatus,
        work_done: i32,
    ) -> Result<(), Error> {
        WorkerRepository::new(&self.db)
            .check_in(worker_id, status, work_done)
            .await?;

        Ok(())
    }

    /// Registers the death of a worker.
    ///
    /// The DEAD transition happens at most once; a repeated call is a no-op
    /// on every count. For a worker bound to an analysis, the running count
    /// drops, NO_WORK marks the analysis ALL_CLAIMED, reclaimable causes
    /// release the worker's in-flight jobs back to READY, and — after a
    /// safe-sync — one replacement worker is requested unless the analysis
    /// finished.
    pub async fn register_worker_death(
        &self,
        dead_worker: &worker::Model,
        cause: Option<CauseOfDeath>,
    ) -> Result<(), Error> {
        let worker_repo = WorkerRepository::new(&self.db);
        let stats_repo = AnalysisStatsRepository::new(&self.db);
        let job_repo = JobRepository::new(&self.db);

        let cause = cause.unwrap_or(CauseOfDeath::Unknown);

        let transitioned = worker_repo
            .register_death(dead_worker.worker_id, cause, dead_worker.work_done)
            .await?;
        if !transitioned {
            return Ok(());
        }

        tracing::info!(
            worker_id = dead_worker.worker_id,
            cause = ?cause,
            "worker death registered"
        );

        let Some(analysis_id) = dead_worker.analysis_id else {
            return Ok(());
        };

        stats_repo.decrement_running(analysis_id).await?;

        if cause == CauseOfDeath::NoWork {
            stats_repo
                .set_status(analysis_id, AnalysisStatus::AllClaimed)
                .await?;
        }

        if RECLAIM_CAUSES.contains(&cause) {
            let released = job_repo
                .release_undone_from_worker(dead_worker.worker_id)
                .await?;
            if released > 0 {
                tracing::info!(
                    worker_id = dead_worker.worker_id,
                    released,
                    "released orphaned jobs"
                );
            }
        }

        let stats = stats_repo
            .fetch(analysis_id)
            .await?
            .ok_or(LookupError::StatsNotFound(analysis_id))?;
        let stats = self.safe_synchronize_stats(stats).await?;

        // One replacement is requested explicitly; the sync above may have
        // been skipped by a lock or freshness guard and cannot be relied on
        // to have noticed the loss.
        if stats.status != AnalysisStatus::Done {
            stats_repo.increment_required(analysis_id).await?;
        }

        Ok(())
    }

    /// Garbage-collects workers whose processes have vanished.
    ///
    /// Groups non-dead workers by meadow type and asks each reachable driver
    /// for its live process map. Workers on unreachable meadows are skipped —
    /// never declared dead on suspicion. Workers whose process is absent are
    /// LOST; their post-mortem cause is fetched where the driver supports it,
    /// UNKNOWN otherwise, and their deaths are registered the normal way.
    ///
    /// With `also_check_buried_in_haste`, an extra integrity pass releases
    /// non-terminal jobs still owned by workers that are already DEAD —
    /// independent of meadow state.
    pub async fn check_for_dead_workers(
        &self,
        valley: &Valley,
        also_check_buried_in_haste: bool,
    ) -> Result<DeadWorkerSweep, Error> {
        let worker_repo = WorkerRepository::new(&self.db);
        let job_repo = JobRepository::new(&self.db);

        let mut sweep = DeadWorkerSweep::default();

        let mut by_meadow_type: HashMap<String, Vec<worker::Model>> = HashMap::new();
        for candidate in worker_repo.fetch_non_dead().await? {
            sweep.workers_checked += 1;
            by_meadow_type
                .entry(candidate.meadow_type.clone())
                .or_default()
                .push(candidate);
        }

        for (meadow_type, group) in by_meadow_type {
            let Some(meadow) = valley.meadow(&meadow_type) else {
                tracing::warn!(
                    meadow_type = %meadow_type,
                    workers = group.len(),
                    "no meadow of this type in the valley, workers unreachable"
                );
                sweep.workers_unreachable += group.len();
                continue;
            };

            let process_statuses = match meadow.status_of_all_our_workers().await {
                Ok(statuses) => statuses,
                Err(error) => {
                    tracing::warn!(
                        meadow_type = %meadow_type,
                        error = %error,
                        workers = group.len(),
                        "meadow unreachable, skipping its workers"
                    );
                    sweep.workers_unreachable += group.len();
                    continue;
                }
            };

            let lost: Vec<&worker::Model> = group
                .iter()
                .filter(|candidate| !process_statuses.contains_key(&candidate.process_id))
                .collect();

            if lost.is_empty() {
                continue;
            }

            let causes = if meadow.supports_post_mortem() {
                let process_ids: Vec<String> =
                    lost.iter().map(|w| w.process_id.clone()).collect();
                match meadow.find_out_causes(&process_ids).await {
                    Ok(causes) => causes,
                    Err(error) => {
                        tracing::warn!(
                            meadow_type = %meadow_type,
                            error = %error,
                            "post-mortem lookup failed, defaulting to UNKNOWN"
                        );
                        HashMap::new()
                    }
                }
            } else {
                HashMap::new()
            };

            for lost_worker in lost {
                let cause = causes.get(&lost_worker.process_id).copied();
                self.register_worker_death(lost_worker, cause).await?;
                sweep.workers_lost += 1;
            }
        }

        if also_check_buried_in_haste {
            for buried in worker_repo.fetch_dead_with_unfinished_jobs().await? {
                sweep.jobs_released += job_repo
                    .release_unfinished_from_worker(buried.worker_id)
                    .await?;
            }
        }

        Ok(sweep)
    }
}
