use sea_orm::entity::prelude::*;

/// One unit of work. Owned by at most one worker at a time via `worker_id`;
/// may be held back by a semaphore on a parent job.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub job_id: i64,
    pub analysis_id: i32,
    pub worker_id: Option<i64>,
    pub status: JobStatus,
    pub retry_count: i32,
    /// Number of child jobs still blocking this one; 0 means runnable.
    pub semaphore_count: i32,
    /// Parent job whose semaphore this job decrements on completion.
    pub semaphored_job_id: Option<i64>,
    pub runtime_msec: Option<i64>,
    pub when_completed: Option<DateTime>,
}

/// Where a job is in its life, from READY through the in-flight states to a
/// terminal DONE/FAILED/PASSED_ON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum JobStatus {
    #[sea_orm(string_value = "READY")]
    Ready,
    #[sea_orm(string_value = "SEMAPHORED")]
    Semaphored,
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
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "PASSED_ON")]
    PassedOn,
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
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::WorkerId"
    )]
    Worker,
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl Related<super::worker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Worker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
