//! Analysis repository.
//!
//! Creating an analysis always creates its statistics row in the same call so
//! the synchronizer and scheduler can rely on one existing per analysis.

use entity::analysis_stats::AnalysisStatus;
use entity::{analysis, analysis_stats};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Parameters for registering a new analysis and its statistics row.
pub struct NewAnalysis {
    /// Unique pipeline-stage name.
    pub logic_name: String,
    /// Resource class its workers must be submitted under.
    pub resource_class_id: i32,
    /// Backend this analysis is pinned to; `None` uses the default meadow.
    pub meadow_type: Option<String>,
    /// Scheduling priority, higher first.
    pub priority: i32,
    /// `None` = unlimited, `0` = disabled, `> 0` = concurrent-worker cap.
    pub hive_capacity: Option<i32>,
    /// Jobs a worker claims per trip to the database.
    pub batch_size: i32,
    /// Percentage of failed jobs tolerated before the analysis fails.
    pub failed_job_tolerance: i32,
}

impl NewAnalysis {
    /// A new analysis with default scheduling knobs (unlimited capacity,
    /// batch size 1, priority 0, zero failure tolerance).
    pub fn new(logic_name: impl Into<String>, resource_class_id: i32) -> Self {
        Self {
            logic_name: logic_name.into(),
            resource_class_id,
            meadow_type: None,
            priority: 0,
            hive_capacity: None,
            batch_size: 1,
            failed_job_tolerance: 0,
        }
    }
}

/// Repository for the `analysis_base` table and its paired statistics rows.
pub struct AnalysisRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AnalysisRepository<'a, C> {
    /// Creates a new instance of AnalysisRepository.
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Inserts an analysis together with its statistics row.
    ///
    /// # Arguments
    /// - `new` - Analysis parameters; capacity/batch/tolerance land on the
    ///   statistics row
    ///
    /// # Returns
    /// - `Ok((analysis, stats))` - Both freshly inserted rows
    /// - `Err(DbErr)` - Either insertion failed
    pub async fn create(
        &self,
        new: NewAnalysis,
    ) -> Result<(analysis::Model, analysis_stats::Model), DbErr> {
        let analysis = analysis::ActiveModel {
            logic_name: ActiveValue::Set(new.logic_name),
            resource_class_id: ActiveValue::Set(new.resource_class_id),
            meadow_type: ActiveValue::Set(new.meadow_type),
            priority: ActiveValue::Set(new.priority),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let stats = analysis_stats::ActiveModel {
            analysis_id: ActiveValue::Set(analysis.analysis_id),
            status: ActiveValue::Set(AnalysisStatus::Loading),
            total_job_count: ActiveValue::Set(0),
            ready_job_count: ActiveValue::Set(0),
            semaphored_job_count: ActiveValue::Set(0),
            done_job_count: ActiveValue::Set(0),
            failed_job_count: ActiveValue::Set(0),
            num_required_workers: ActiveValue::Set(0),
            num_running_workers: ActiveValue::Set(0),
            hive_capacity: ActiveValue::Set(new.hive_capacity),
            batch_size: ActiveValue::Set(new.batch_size),
            failed_job_tolerance: ActiveValue::Set(new.failed_job_tolerance),
            avg_msec_per_job: ActiveValue::Set(None),
            sync_lock: ActiveValue::Set(false),
            when_updated: ActiveValue::Set(None),
        }
        .insert(self.db)
        .await?;

        Ok((analysis, stats))
    }

    /// Retrieves an analysis by id.
    pub async fn fetch_by_id(&self, analysis_id: i32) -> Result<Option<analysis::Model>, DbErr> {
        analysis::Entity::find_by_id(analysis_id).one(self.db).await
    }

    /// Retrieves all analyses.
    pub async fn fetch_all(&self) -> Result<Vec<analysis::Model>, DbErr> {
        analysis::Entity::find().all(self.db).await
    }

    /// Retrieves an analysis by its unique logic name.
    pub async fn fetch_by_logic_name(
        &self,
        logic_name: &str,
    ) -> Result<Option<analysis::Model>, DbErr> {
        analysis::Entity::find()
            .filter(analysis::Column::LogicName.eq(logic_name))
            .one(self.db)
            .await
    }

    /// Retrieves analyses paired with their statistics, most suitable first.
    ///
    /// Suitability ordering: priority descending, then unmet worker demand
    /// descending, then analysis id ascending as a deterministic tie-break.
    /// The scheduler and automatic specialization consume this order as-is
    /// and never re-sort.
    ///
    /// # Arguments
    /// - `resource_class_id` - When given, restricts candidates to analyses
    ///   of that resource class
    pub async fn fetch_all_by_suitability(
        &self,
        resource_class_id: Option<i32>,
    ) -> Result<Vec<(analysis::Model, analysis_stats::Model)>, DbErr> {
        let mut query = analysis::Entity::find()
            .find_also_related(analysis_stats::Entity)
            .order_by_desc(analysis::Column::Priority)
            .order_by_desc(analysis_stats::Column::NumRequiredWorkers)
            .order_by_asc(analysis::Column::AnalysisId);

        if let Some(resource_class_id) = resource_class_id {
            query = query.filter(analysis::Column::ResourceClassId.eq(resource_class_id));
        }

        let rows = query.all(self.db).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(analysis, stats)| stats.map(|stats| (analysis, stats)))
            .collect())
    }
}
