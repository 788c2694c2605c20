use sea_orm::entity::prelude::*;

/// Mutable per-analysis aggregate: job counts, worker accounting, capacity and
/// the sync lock. Rebuilt from the `job` and `worker` tables by the queen's
/// synchronizer; everything else only reads it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "analysis_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub analysis_id: i32,
    pub status: AnalysisStatus,
    pub total_job_count: i64,
    pub ready_job_count: i64,
    pub semaphored_job_count: i64,
    pub done_job_count: i64,
    pub failed_job_count: i64,
    pub num_required_workers: i32,
    pub num_running_workers: i32,
    /// `None` = unlimited, `0` = analysis disabled, `> 0` = concurrency cap.
    pub hive_capacity: Option<i32>,
    /// Jobs a worker claims per trip to the database.
    pub batch_size: i32,
    /// Percentage of failed jobs tolerated before the analysis counts as FAILED.
    pub failed_job_tolerance: i32,
    pub avg_msec_per_job: Option<i64>,
    pub sync_lock: bool,
    pub when_updated: Option<DateTime>,
}

/// Lifecycle state of an analysis, derived from its job counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AnalysisStatus {
    #[sea_orm(string_value = "LOADING")]
    Loading,
    #[sea_orm(string_value = "BLOCKED")]
    Blocked,
    #[sea_orm(string_value = "SYNCHING")]
    Synching,
    #[sea_orm(string_value = "READY")]
    Ready,
    #[sea_orm(string_value = "WORKING")]
    Working,
    #[sea_orm(string_value = "ALL_CLAIMED")]
    AllClaimed,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::analysis::Entity",
        from = "Column::AnalysisId",
        to = "super::analysis::Column::AnalysisId"
    )]
    Analysis,
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
