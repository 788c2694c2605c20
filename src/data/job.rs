//! Job repository.
//!
//! The queen never executes jobs; it only rebuilds aggregates from them,
//! releases the ones orphaned by dead workers, and performs the atomic
//! reset-or-grab used by job-targeted specialization.

use entity::job::{self, JobStatus};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Statuses meaning "a worker is actively holding this job".
pub const IN_FLIGHT_JOB_STATUSES: [JobStatus; 6] = [
    JobStatus::Claimed,
    JobStatus::PreCleanup,
    JobStatus::FetchInput,
    JobStatus::Run,
    JobStatus::WriteOutput,
    JobStatus::PostCleanup,
];

/// Statuses of jobs that are not settled: the in-flight set plus SEMAPHORED.
/// READY, DONE, FAILED and PASSED_ON jobs are never touched by integrity
/// passes.
pub const NON_TERMINAL_JOB_STATUSES: [JobStatus; 7] = [
    JobStatus::Semaphored,
    JobStatus::Claimed,
    JobStatus::PreCleanup,
    JobStatus::FetchInput,
    JobStatus::Run,
    JobStatus::WriteOutput,
    JobStatus::PostCleanup,
];

/// Repository for the `job` table.
pub struct JobRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> JobRepository<'a, C> {
    /// Creates a new instance of JobRepository.
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Retrieves a job by id.
    pub async fn fetch_by_id(&self, job_id: i64) -> Result<Option<job::Model>, DbErr> {
        job::Entity::find_by_id(job_id).one(self.db).await
    }

    /// Counts one analysis' jobs grouped by status.
    ///
    /// This is the ground-truth rebuild the synchronizer runs:
    /// `SELECT status, COUNT(*) FROM job WHERE analysis_id = ? GROUP BY status`.
    pub async fn count_by_status(
        &self,
        analysis_id: i32,
    ) -> Result<Vec<(JobStatus, i64)>, DbErr> {
        job::Entity::find()
            .select_only()
            .column(job::Column::Status)
            .column_as(job::Column::JobId.count(), "job_count")
            .filter(job::Column::AnalysisId.eq(analysis_id))
            .group_by(job::Column::Status)
            .into_tuple()
            .all(self.db)
            .await
    }

    /// Runtimes of the most recently finished jobs of one analysis, newest
    /// first. Input for the `avg_msec_per_job` aggregate.
    pub async fn recent_done_runtimes(
        &self,
        analysis_id: i32,
        limit: u64,
    ) -> Result<Vec<i64>, DbErr> {
        job::Entity::find()
            .select_only()
            .column(job::Column::RuntimeMsec)
            .filter(job::Column::AnalysisId.eq(analysis_id))
            .filter(job::Column::Status.is_in([JobStatus::Done, JobStatus::PassedOn]))
            .filter(job::Column::RuntimeMsec.is_not_null())
            .order_by_desc(job::Column::JobId)
            .limit(limit)
            .into_tuple()
            .all(self.db)
            .await
    }

    /// Releases every in-flight job held by one worker back to READY.
    ///
    /// Clears the owner, bumps the retry counter and only touches jobs in an
    /// in-flight status; terminal and semaphored jobs stay as they are.
    ///
    /// # Returns
    /// - `Ok(n)` - Number of jobs released
    /// - `Err(DbErr)` - Database error
    pub async fn release_undone_from_worker(&self, worker_id: i64) -> Result<u64, DbErr> {
        let result = job::Entity::update_many()
            .col_expr(job::Column::Status, Expr::value(JobStatus::Ready))
            .col_expr(job::Column::WorkerId, Expr::value(Option::<i64>::None))
            .col_expr(
                job::Column::RetryCount,
                Expr::col(job::Column::RetryCount).add(1),
            )
            .filter(job::Column::WorkerId.eq(worker_id))
            .filter(job::Column::Status.is_in(IN_FLIGHT_JOB_STATUSES))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Releases every non-terminal job still held by one worker back to
    /// READY.
    ///
    /// The wider net behind the buried-in-haste integrity pass: unlike
    /// [`Self::release_undone_from_worker`] it also frees SEMAPHORED jobs a
    /// dead worker somehow kept hold of.
    ///
    /// # Returns
    /// - `Ok(n)` - Number of jobs released
    /// - `Err(DbErr)` - Database error
    pub async fn release_unfinished_from_worker(&self, worker_id: i64) -> Result<u64, DbErr> {
        let result = job::Entity::update_many()
            .col_expr(job::Column::Status, Expr::value(JobStatus::Ready))
            .col_expr(job::Column::WorkerId, Expr::value(Option::<i64>::None))
            .col_expr(
                job::Column::RetryCount,
                Expr::col(job::Column::RetryCount).add(1),
            )
            .filter(job::Column::WorkerId.eq(worker_id))
            .filter(job::Column::Status.is_in(NON_TERMINAL_JOB_STATUSES))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Atomically resets a job and grabs it for one worker.
    ///
    /// Succeeds only while no other worker is actively holding the job; the
    /// status check lives in the WHERE clause so two coordinators cannot both
    /// win.
    ///
    /// # Returns
    /// - `Ok(true)` - The job now belongs to `worker_id` with status CLAIMED
    /// - `Ok(false)` - Another worker grabbed it first
    /// - `Err(DbErr)` - Database error
    pub async fn reset_or_grab(&self, job_id: i64, worker_id: i64) -> Result<bool, DbErr> {
        let result = job::Entity::update_many()
            .col_expr(job::Column::Status, Expr::value(JobStatus::Claimed))
            .col_expr(job::Column::WorkerId, Expr::value(Some(worker_id)))
            .filter(job::Column::JobId.eq(job_id))
            .filter(job::Column::Status.is_not_in(IN_FLIGHT_JOB_STATUSES))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Re-increments the semaphore on a parent job whose child is about to be
    /// re-run, restoring the "parent still blocked" invariant. A parent that
    /// had become runnable is pushed back to SEMAPHORED.
    pub async fn increment_semaphore(&self, job_id: i64) -> Result<(), DbErr> {
        job::Entity::update_many()
            .col_expr(
                job::Column::SemaphoreCount,
                Expr::col(job::Column::SemaphoreCount).add(1),
            )
            .filter(job::Column::JobId.eq(job_id))
            .exec(self.db)
            .await?;

        job::Entity::update_many()
            .col_expr(job::Column::Status, Expr::value(JobStatus::Semaphored))
            .filter(job::Column::JobId.eq(job_id))
            .filter(job::Column::Status.eq(JobStatus::Ready))
            .exec(self.db)
            .await?;

        Ok(())
    }
}
