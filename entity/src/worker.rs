use sea_orm::entity::prelude::*;

/// One ephemeral worker process. Created by the queen at birth, specialized
/// to an analysis exactly once, checked in periodically, transitioned to DEAD
/// exactly once and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "worker")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub worker_id: i64,
    pub meadow_type: String,
    pub meadow_name: String,
    pub host: String,
    /// Backend-specific process identifier; an OS pid locally, a queue job id
    /// on batch systems, so it is kept as a string.
    pub process_id: String,
    pub resource_class_id: i32,
    pub analysis_id: Option<i32>,
    pub born: DateTime,
    pub last_check_in: DateTime,
    pub died: Option<DateTime>,
    pub status: WorkerStatus,
    pub work_done: i32,
    pub cause_of_death: Option<CauseOfDeath>,
    pub log_dir: Option<String>,
}

/// What a worker is currently doing, as last reported by a check-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum WorkerStatus {
    #[sea_orm(string_value = "READY")]
    Ready,
    #[sea_orm(string_value = "CLAIMED")]
    Claimed,
    #[sea_orm(string_value = "PRE_CLEANUP")]
    PreCleanup,
    #[sea_orm(string_value = "FETCH_INPUT")]
    FetchInput,
    #[sea_orm(string_value = "RUN")]
    Run,
    #[sea_orm(string_value = "WRITE_OUTPUT")]
    WriteOutput,
    #[sea_orm(string_value = "POST_CLEANUP")]
    PostCleanup,
    #[sea_orm(string_value = "DEAD")]
    Dead,
}

/// Why a worker died. Recorded once at death registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CauseOfDeath {
    #[sea_orm(string_value = "NO_WORK")]
    NoWork,
    #[sea_orm(string_value = "JOB_LIMIT")]
    JobLimit,
    #[sea_orm(string_value = "LIFESPAN")]
    Lifespan,
    #[sea_orm(string_value = "HIVE_OVERLOAD")]
    HiveOverload,
    #[sea_orm(string_value = "MEMLIMIT")]
    Memlimit,
    #[sea_orm(string_value = "RUNLIMIT")]
    Runlimit,
    #[sea_orm(string_value = "KILLED_BY_USER")]
    KilledByUser,
    #[sea_orm(string_value = "SEE_MSG")]
    SeeMsg,
    #[sea_orm(string_value = "CONTAMINATED")]
    Contaminated,
    #[sea_orm(string_value = "UNKNOWN")]
    Unknown,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::analysis::Entity",
        from = "Column::AnalysisId",
        to = "super::analysis::Column::AnalysisId"
    )]
    Analysis,
    #[sea_orm(
        belongs_to = "super::analysis_stats::Entity",
        from = "Column::AnalysisId",
        to = "super::analysis_stats::Column::AnalysisId"
    )]
    AnalysisStats,
    #[sea_orm(
        belongs_to = "super::resource_class::Entity",
        from = "Column::ResourceClassId",
        to = "super::resource_class::Column::ResourceClassId"
    )]
    ResourceClass,
    #[sea_orm(has_many = "super::job::Entity")]
    Job,
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl Related<super::resource_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResourceClass.def()
    }
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
