//! Imperative fixtures over a test hive.
//!
//! Fixtures go through the production repositories where one exists for the
//! operation, and fall back to entity active models for shapes only tests
//! need (pre-dated lifespans, hand-tuned statistics).

use apiary::data::{
    AnalysisRepository, JobRepository, NewAnalysis, ResourceClassRepository, WorkerRepository,
};
use chrono::NaiveDateTime;
use entity::analysis_stats;
use entity::job::{self, JobStatus};
use entity::worker::{self, WorkerStatus};
use entity::{analysis, resource_class};
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait};

use crate::error::TestError;

/// Fixture helpers bound to one test database.
pub struct HiveFixtures<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> HiveFixtures<'a> {
    /// Creates fixture helpers over a connection.
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a resource class.
    pub async fn insert_resource_class(
        &self,
        name: &str,
    ) -> Result<resource_class::Model, TestError> {
        Ok(ResourceClassRepository::new(self.db).create(name).await?)
    }

    /// Inserts an analysis together with its statistics row.
    pub async fn insert_analysis(
        &self,
        new: NewAnalysis,
    ) -> Result<(analysis::Model, analysis_stats::Model), TestError> {
        Ok(AnalysisRepository::new(self.db).create(new).await?)
    }

    /// Inserts a live worker through the production repository, optionally
    /// already bound to an analysis.
    pub async fn insert_worker(
        &self,
        resource_class_id: i32,
        analysis_id: Option<i32>,
    ) -> Result<worker::Model, TestError> {
        let repo = WorkerRepository::new(self.db);

        let new_worker = repo
            .insert(apiary::data::NewWorker {
                meadow_type: "LOCAL".to_string(),
                meadow_name: "mock".to_string(),
                host: "localhost".to_string(),
                process_id: format!("pid_{}", rand_suffix()),
                resource_class_id,
            })
            .await?;

        if let Some(analysis_id) = analysis_id {
            repo.bind_to_analysis(new_worker.worker_id, analysis_id)
                .await?;
        }

        Ok(repo
            .fetch_by_id(new_worker.worker_id)
            .await?
            .expect("worker fixture vanished"))
    }

    /// Inserts a worker row with an explicit lifespan, for profiler tests.
    /// A worker with a death timestamp is inserted already DEAD.
    pub async fn insert_worker_lifespan(
        &self,
        resource_class_id: i32,
        analysis_id: i32,
        born: NaiveDateTime,
        died: Option<NaiveDateTime>,
    ) -> Result<worker::Model, TestError> {
        let status = if died.is_some() {
            WorkerStatus::Dead
        } else {
            WorkerStatus::Run
        };

        Ok(worker::ActiveModel {
            meadow_type: ActiveValue::Set("LOCAL".to_string()),
            meadow_name: ActiveValue::Set("mock".to_string()),
            host: ActiveValue::Set("localhost".to_string()),
            process_id: ActiveValue::Set(format!("pid_{}", rand_suffix())),
            resource_class_id: ActiveValue::Set(resource_class_id),
            analysis_id: ActiveValue::Set(Some(analysis_id)),
            born: ActiveValue::Set(born),
            last_check_in: ActiveValue::Set(died.unwrap_or(born)),
            died: ActiveValue::Set(died),
            status: ActiveValue::Set(status),
            work_done: ActiveValue::Set(0),
            cause_of_death: ActiveValue::Set(None),
            log_dir: ActiveValue::Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Inserts a job, optionally owned by a worker.
    pub async fn insert_job(
        &self,
        analysis_id: i32,
        status: JobStatus,
        worker_id: Option<i64>,
    ) -> Result<job::Model, TestError> {
        Ok(job::ActiveModel {
            analysis_id: ActiveValue::Set(analysis_id),
            worker_id: ActiveValue::Set(worker_id),
            status: ActiveValue::Set(status),
            retry_count: ActiveValue::Set(0),
            semaphore_count: ActiveValue::Set(0),
            semaphored_job_id: ActiveValue::Set(None),
            runtime_msec: ActiveValue::Set(None),
            when_completed: ActiveValue::Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Inserts a finished job carrying a recorded runtime.
    pub async fn insert_finished_job(
        &self,
        analysis_id: i32,
        status: JobStatus,
        runtime_msec: i64,
    ) -> Result<job::Model, TestError> {
        Ok(job::ActiveModel {
            analysis_id: ActiveValue::Set(analysis_id),
            worker_id: ActiveValue::Set(None),
            status: ActiveValue::Set(status),
            retry_count: ActiveValue::Set(0),
            semaphore_count: ActiveValue::Set(0),
            semaphored_job_id: ActiveValue::Set(None),
            runtime_msec: ActiveValue::Set(Some(runtime_msec)),
            when_completed: ActiveValue::Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Inserts a job wired into a semaphore structure.
    pub async fn insert_semaphored_job(
        &self,
        analysis_id: i32,
        status: JobStatus,
        semaphore_count: i32,
        semaphored_job_id: Option<i64>,
    ) -> Result<job::Model, TestError> {
        Ok(job::ActiveModel {
            analysis_id: ActiveValue::Set(analysis_id),
            worker_id: ActiveValue::Set(None),
            status: ActiveValue::Set(status),
            retry_count: ActiveValue::Set(0),
            semaphore_count: ActiveValue::Set(semaphore_count),
            semaphored_job_id: ActiveValue::Set(semaphored_job_id),
            runtime_msec: ActiveValue::Set(None),
            when_completed: ActiveValue::Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Fetches the statistics row of an analysis.
    pub async fn fetch_stats(
        &self,
        analysis_id: i32,
    ) -> Result<analysis_stats::Model, TestError> {
        Ok(analysis_stats::Entity::find_by_id(analysis_id)
            .one(self.db)
            .await?
            .expect("statistics fixture missing"))
    }

    /// Persists hand-tuned statistics (stale counts, held locks and the like).
    pub async fn save_stats(
        &self,
        stats: analysis_stats::ActiveModel,
    ) -> Result<analysis_stats::Model, TestError> {
        Ok(stats.update(self.db).await?)
    }

    /// Fetches a worker row.
    pub async fn fetch_worker(&self, worker_id: i64) -> Result<worker::Model, TestError> {
        Ok(WorkerRepository::new(self.db)
            .fetch_by_id(worker_id)
            .await?
            .expect("worker fixture missing"))
    }

    /// Fetches a job row.
    pub async fn fetch_job(&self, job_id: i64) -> Result<job::Model, TestError> {
        Ok(JobRepository::new(self.db)
            .fetch_by_id(job_id)
            .await?
            .expect("job fixture missing"))
    }
}

/// Cheap unique-ish suffix so fixture process ids do not collide.
fn rand_suffix() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
