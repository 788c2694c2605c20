//! Worker repository.
//!
//! A worker row is written at birth, touched by check-ins, bound to an
//! analysis exactly once and transitioned to DEAD exactly once. The death
//! transition is guarded by `died IS NULL` so that repeated registration of
//! the same death is a no-op the caller can detect.

use chrono::{NaiveDateTime, Utc};
use entity::worker::{self, CauseOfDeath, WorkerStatus};
use entity::{analysis_stats, job};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait,
};

use crate::data::job::NON_TERMINAL_JOB_STATUSES;

/// Identity fields for registering a newly spawned worker process.
pub struct NewWorker {
    /// Type of the meadow the process runs on (e.g. "LSF", "LOCAL").
    pub meadow_type: String,
    /// Name of the concrete meadow instance.
    pub meadow_name: String,
    /// Host the process landed on.
    pub host: String,
    /// Backend-specific process identifier.
    pub process_id: String,
    /// Resource class the process was submitted under.
    pub resource_class_id: i32,
}

/// Repository for the `worker` table.
pub struct WorkerRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> WorkerRepository<'a, C> {
    /// Creates a new instance of WorkerRepository.
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Inserts a worker row with `born = last_check_in = now`.
    ///
    /// # Returns
    /// - `Ok(Model)` - The created worker including its database-assigned id
    /// - `Err(DbErr)` - Insertion failed; no partial row exists
    pub async fn insert(&self, new: NewWorker) -> Result<worker::Model, DbErr> {
        let now = Utc::now().naive_utc();

        worker::ActiveModel {
            meadow_type: ActiveValue::Set(new.meadow_type),
            meadow_name: ActiveValue::Set(new.meadow_name),
            host: ActiveValue::Set(new.host),
            process_id: ActiveValue::Set(new.process_id),
            resource_class_id: ActiveValue::Set(new.resource_class_id),
            analysis_id: ActiveValue::Set(None),
            born: ActiveValue::Set(now),
            last_check_in: ActiveValue::Set(now),
            died: ActiveValue::Set(None),
            status: ActiveValue::Set(WorkerStatus::Ready),
            work_done: ActiveValue::Set(0),
            cause_of_death: ActiveValue::Set(None),
            log_dir: ActiveValue::Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Retrieves a worker by id.
    pub async fn fetch_by_id(&self, worker_id: i64) -> Result<Option<worker::Model>, DbErr> {
        worker::Entity::find_by_id(worker_id).one(self.db).await
    }

    /// Records the per-worker log directory on the row.
    pub async fn set_log_dir(&self, worker_id: i64, log_dir: &str) -> Result<(), DbErr> {
        worker::Entity::update_many()
            .col_expr(worker::Column::LogDir, Expr::value(log_dir))
            .filter(worker::Column::WorkerId.eq(worker_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Binds a worker to its analysis. Called exactly once per worker, at
    /// specialization.
    pub async fn bind_to_analysis(&self, worker_id: i64, analysis_id: i32) -> Result<(), DbErr> {
        worker::Entity::update_many()
            .col_expr(worker::Column::AnalysisId, Expr::value(Some(analysis_id)))
            .filter(worker::Column::WorkerId.eq(worker_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Single-row check-in update: `last_check_in = now`, status, work done.
    /// Idempotent.
    pub async fn check_in(
        &self,
        worker_id: i64,
        status: WorkerStatus,
        work_done: i32,
    ) -> Result<(), DbErr> {
        worker::Entity::update_many()
            .col_expr(
                worker::Column::LastCheckIn,
                Expr::value(Utc::now().naive_utc()),
            )
            .col_expr(worker::Column::Status, Expr::value(status))
            .col_expr(worker::Column::WorkDone, Expr::value(work_done))
            .filter(worker::Column::WorkerId.eq(worker_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Transitions a worker to DEAD, once.
    ///
    /// The update is conditional on `died IS NULL`; a second registration of
    /// the same death affects zero rows.
    ///
    /// # Returns
    /// - `Ok(true)` - The worker transitioned now; follow-up accounting must run
    /// - `Ok(false)` - The worker was already dead; the caller must not touch counts
    /// - `Err(DbErr)` - Database error
    pub async fn register_death(
        &self,
        worker_id: i64,
        cause: CauseOfDeath,
        work_done: i32,
    ) -> Result<bool, DbErr> {
        let now = Utc::now().naive_utc();

        let result = worker::Entity::update_many()
            .col_expr(worker::Column::Died, Expr::value(now))
            .col_expr(worker::Column::LastCheckIn, Expr::value(now))
            .col_expr(worker::Column::Status, Expr::value(WorkerStatus::Dead))
            .col_expr(worker::Column::CauseOfDeath, Expr::value(cause))
            .col_expr(worker::Column::WorkDone, Expr::value(work_done))
            .filter(worker::Column::WorkerId.eq(worker_id))
            .filter(worker::Column::Died.is_null())
            .exec(self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Retrieves all workers not yet registered as dead.
    pub async fn fetch_non_dead(&self) -> Result<Vec<worker::Model>, DbErr> {
        worker::Entity::find()
            .filter(worker::Column::Status.ne(WorkerStatus::Dead))
            .all(self.db)
            .await
    }

    /// Counts workers not yet registered as dead.
    pub async fn count_non_dead(&self) -> Result<u64, DbErr> {
        worker::Entity::find()
            .filter(worker::Column::Status.ne(WorkerStatus::Dead))
            .count(self.db)
            .await
    }

    /// Counts live workers bound to one analysis. Ground truth behind the
    /// `num_running_workers` aggregate.
    pub async fn count_running_for_analysis(&self, analysis_id: i32) -> Result<u64, DbErr> {
        worker::Entity::find()
            .filter(worker::Column::AnalysisId.eq(analysis_id))
            .filter(worker::Column::Status.ne(WorkerStatus::Dead))
            .count(self.db)
            .await
    }

    /// Retrieves workers already registered DEAD that still own a job in a
    /// non-terminal state ("buried in haste"). SEMAPHORED counts as
    /// non-terminal here, not just the in-flight statuses.
    pub async fn fetch_dead_with_unfinished_jobs(&self) -> Result<Vec<worker::Model>, DbErr> {
        worker::Entity::find()
            .join(JoinType::InnerJoin, worker::Relation::Job.def())
            .filter(worker::Column::Status.eq(WorkerStatus::Dead))
            .filter(job::Column::Status.is_in(NON_TERMINAL_JOB_STATUSES))
            .distinct()
            .all(self.db)
            .await
    }

    /// Current hive load: `Σ 1/hive_capacity` over live workers whose
    /// analysis is capacity-bounded. 1.0 means "full".
    pub async fn hive_current_load(&self) -> Result<f64, DbErr> {
        // 1e0 keeps the division in double precision on MySQL, where a
        // DECIMAL sum would not decode into f64.
        let load: Option<Option<f64>> = worker::Entity::find()
            .select_only()
            .column_as(
                Expr::cust("SUM(1e0 / analysis_stats.hive_capacity)"),
                "current_load",
            )
            .join(JoinType::InnerJoin, worker::Relation::AnalysisStats.def())
            .filter(worker::Column::Status.ne(WorkerStatus::Dead))
            .filter(analysis_stats::Column::HiveCapacity.gt(0))
            .into_tuple()
            .one(self.db)
            .await?;

        Ok(load.flatten().unwrap_or(0.0))
    }

    /// Retrieves `(analysis_id, born, died)` for every specialized worker,
    /// for activity-profile reconstruction.
    pub async fn fetch_lifespans(
        &self,
    ) -> Result<Vec<(i32, NaiveDateTime, Option<NaiveDateTime>)>, DbErr> {
        worker::Entity::find()
            .select_only()
            .column(worker::Column::AnalysisId)
            .column(worker::Column::Born)
            .column(worker::Column::Died)
            .filter(worker::Column::AnalysisId.is_not_null())
            .into_tuple()
            .all(self.db)
            .await
    }
}
