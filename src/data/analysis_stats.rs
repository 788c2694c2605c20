//! Analysis statistics repository.
//!
//! Counter adjustments are expressed as guarded `UPDATE … WHERE` statements
//! so concurrent coordinators can never drive a counter negative, and the
//! sync lock is claimed through a conditional update whose row count tells
//! the caller whether it won.

use chrono::Utc;
use entity::analysis_stats::{self, AnalysisStatus};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
};

use crate::data::dialect;

/// Repository for the `analysis_stats` table.
pub struct AnalysisStatsRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AnalysisStatsRepository<'a, C> {
    /// Creates a new instance of AnalysisStatsRepository.
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Retrieves the statistics row for one analysis.
    pub async fn fetch(
        &self,
        analysis_id: i32,
    ) -> Result<Option<analysis_stats::Model>, DbErr> {
        analysis_stats::Entity::find_by_id(analysis_id)
            .one(self.db)
            .await
    }

    /// Retrieves all statistics rows.
    pub async fn fetch_all(&self) -> Result<Vec<analysis_stats::Model>, DbErr> {
        analysis_stats::Entity::find().all(self.db).await
    }

    /// Attempts to claim the per-analysis sync lock.
    ///
    /// Runs the conditional update
    /// `SET status = SYNCHING, sync_lock = 1 WHERE analysis_id = ? AND
    /// (sync_lock = 0 OR lock older than ttl)` and reports whether exactly
    /// one row was affected. Only the caller that observes `true` may rebuild
    /// the statistics; everyone else must skip this pass. The expiry arm lets
    /// the next coordinator reap a lock left behind by a crashed one.
    ///
    /// # Arguments
    /// - `analysis_id` - Analysis whose lock to claim
    /// - `lock_ttl_secs` - Age in seconds after which a held lock counts as
    ///   abandoned
    ///
    /// # Returns
    /// - `Ok(true)` - This caller holds the lock and must release it by
    ///   persisting rebuilt statistics
    /// - `Ok(false)` - Another coordinator holds a live lock
    /// - `Err(DbErr)` - Database error
    pub async fn claim_sync_lock(
        &self,
        analysis_id: i32,
        lock_ttl_secs: i64,
    ) -> Result<bool, DbErr> {
        let lock_age = dialect::seconds_since(self.db.get_database_backend(), "when_updated");

        let result = analysis_stats::Entity::update_many()
            .col_expr(
                analysis_stats::Column::Status,
                Expr::value(AnalysisStatus::Synching),
            )
            .col_expr(analysis_stats::Column::SyncLock, Expr::value(true))
            .col_expr(
                analysis_stats::Column::WhenUpdated,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .filter(
                Condition::any()
                    .add(analysis_stats::Column::SyncLock.eq(false))
                    .add(Expr::cust(format!("{lock_age} > {lock_ttl_secs}"))),
            )
            .exec(self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Persists a rebuilt statistics row.
    ///
    /// The caller is expected to have set `sync_lock = false` and a fresh
    /// `when_updated` on the active model; writing the row is what releases
    /// the lock.
    pub async fn update(
        &self,
        stats: analysis_stats::ActiveModel,
    ) -> Result<analysis_stats::Model, DbErr> {
        stats.update(self.db).await
    }

    /// Sets the status of one analysis.
    pub async fn set_status(
        &self,
        analysis_id: i32,
        status: AnalysisStatus,
    ) -> Result<(), DbErr> {
        analysis_stats::Entity::update_many()
            .col_expr(analysis_stats::Column::Status, Expr::value(status))
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Adds one to the running-worker count.
    pub async fn increment_running(&self, analysis_id: i32) -> Result<(), DbErr> {
        analysis_stats::Entity::update_many()
            .col_expr(
                analysis_stats::Column::NumRunningWorkers,
                Expr::col(analysis_stats::Column::NumRunningWorkers).add(1),
            )
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Subtracts one from the running-worker count, never below zero.
    pub async fn decrement_running(&self, analysis_id: i32) -> Result<(), DbErr> {
        analysis_stats::Entity::update_many()
            .col_expr(
                analysis_stats::Column::NumRunningWorkers,
                Expr::col(analysis_stats::Column::NumRunningWorkers).sub(1),
            )
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .filter(analysis_stats::Column::NumRunningWorkers.gt(0))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Adds one to the required-worker count.
    pub async fn increment_required(&self, analysis_id: i32) -> Result<(), DbErr> {
        analysis_stats::Entity::update_many()
            .col_expr(
                analysis_stats::Column::NumRequiredWorkers,
                Expr::col(analysis_stats::Column::NumRequiredWorkers).add(1),
            )
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Subtracts one from the required-worker count, never below zero.
    pub async fn decrement_required(&self, analysis_id: i32) -> Result<(), DbErr> {
        analysis_stats::Entity::update_many()
            .col_expr(
                analysis_stats::Column::NumRequiredWorkers,
                Expr::col(analysis_stats::Column::NumRequiredWorkers).sub(1),
            )
            .filter(analysis_stats::Column::AnalysisId.eq(analysis_id))
            .filter(analysis_stats::Column::NumRequiredWorkers.gt(0))
            .exec(self.db)
            .await?;

        Ok(())
    }

    /// Counts analyses whose status is FAILED, optionally restricted to one.
    pub async fn count_failed(&self, analysis_id: Option<i32>) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;

        let mut query = analysis_stats::Entity::find()
            .filter(analysis_stats::Column::Status.eq(AnalysisStatus::Failed));

        if let Some(analysis_id) = analysis_id {
            query = query.filter(analysis_stats::Column::AnalysisId.eq(analysis_id));
        }

        query.count(self.db).await
    }
}
