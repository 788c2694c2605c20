use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260801_000002_create_analysis_base_table::AnalysisBase;
use crate::m20260801_000004_create_worker_table::Worker;

static FK_JOB_ANALYSIS: &str = "fk_job_analysis_base";
static FK_JOB_WORKER: &str = "fk_job_worker";
static IDX_JOB_ANALYSIS_STATUS: &str = "idx_job_analysis_status";
static IDX_JOB_WORKER: &str = "idx_job_worker";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Job::JobId))
                    .col(integer(Job::AnalysisId))
                    .col(big_integer_null(Job::WorkerId))
                    .col(string_len(Job::Status, 16).default("READY"))
                    .col(integer(Job::RetryCount).default(0))
                    .col(integer(Job::SemaphoreCount).default(0))
                    .col(big_integer_null(Job::SemaphoredJobId))
                    .col(big_integer_null(Job::RuntimeMsec))
                    .col(timestamp_null(Job::WhenCompleted))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_JOB_ANALYSIS)
                            .from(Job::Table, Job::AnalysisId)
                            .to(AnalysisBase::Table, AnalysisBase::AnalysisId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_JOB_WORKER)
                            .from(Job::Table, Job::WorkerId)
                            .to(Worker::Table, Worker::WorkerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_JOB_ANALYSIS_STATUS)
                    .table(Job::Table)
                    .col(Job::AnalysisId)
                    .col(Job::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_JOB_WORKER)
                    .table(Job::Table)
                    .col(Job::WorkerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(IDX_JOB_WORKER).table(Job::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_JOB_ANALYSIS_STATUS)
                    .table(Job::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Job::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Job {
    Table,
    JobId,
    AnalysisId,
    WorkerId,
    Status,
    RetryCount,
    SemaphoreCount,
    SemaphoredJobId,
    RuntimeMsec,
    WhenCompleted,
}
