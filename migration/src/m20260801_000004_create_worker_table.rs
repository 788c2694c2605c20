use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260801_000001_create_resource_class_table::ResourceClass;
use crate::m20260801_000002_create_analysis_base_table::AnalysisBase;

static FK_WORKER_RESOURCE_CLASS: &str = "fk_worker_resource_class";
static FK_WORKER_ANALYSIS: &str = "fk_worker_analysis_base";
static IDX_WORKER_ANALYSIS_STATUS: &str = "idx_worker_analysis_status";
static IDX_WORKER_MEADOW_PROCESS: &str = "idx_worker_meadow_process";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Worker::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Worker::WorkerId))
                    .col(string(Worker::MeadowType))
                    .col(string(Worker::MeadowName))
                    .col(string(Worker::Host))
                    .col(string(Worker::ProcessId))
                    .col(integer(Worker::ResourceClassId))
                    .col(integer_null(Worker::AnalysisId))
                    .col(timestamp(Worker::Born))
                    .col(timestamp(Worker::LastCheckIn))
                    .col(timestamp_null(Worker::Died))
                    .col(string_len(Worker::Status, 16).default("READY"))
                    .col(integer(Worker::WorkDone).default(0))
                    .col(string_len_null(Worker::CauseOfDeath, 16))
                    .col(string_null(Worker::LogDir))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_WORKER_RESOURCE_CLASS)
                            .from(Worker::Table, Worker::ResourceClassId)
                            .to(ResourceClass::Table, ResourceClass::ResourceClassId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_WORKER_ANALYSIS)
                            .from(Worker::Table, Worker::AnalysisId)
                            .to(AnalysisBase::Table, AnalysisBase::AnalysisId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_WORKER_ANALYSIS_STATUS)
                    .table(Worker::Table)
                    .col(Worker::AnalysisId)
                    .col(Worker::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_WORKER_MEADOW_PROCESS)
                    .table(Worker::Table)
                    .col(Worker::MeadowType)
                    .col(Worker::ProcessId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_WORKER_MEADOW_PROCESS)
                    .table(Worker::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_WORKER_ANALYSIS_STATUS)
                    .table(Worker::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Worker::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Worker {
    Table,
    WorkerId,
    MeadowType,
    MeadowName,
    Host,
    ProcessId,
    ResourceClassId,
    AnalysisId,
    Born,
    LastCheckIn,
    Died,
    Status,
    WorkDone,
    CauseOfDeath,
    LogDir,
}
