use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260801_000002_create_analysis_base_table::AnalysisBase;

static FK_ANALYSIS_STATS_ANALYSIS: &str = "fk_analysis_stats_analysis_base";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalysisStats::Table)
                    .if_not_exists()
                    .col(integer(AnalysisStats::AnalysisId).primary_key())
                    .col(string_len(AnalysisStats::Status, 16).default("LOADING"))
                    .col(big_integer(AnalysisStats::TotalJobCount).default(0))
                    .col(big_integer(AnalysisStats::ReadyJobCount).default(0))
                    .col(big_integer(AnalysisStats::SemaphoredJobCount).default(0))
                    .col(big_integer(AnalysisStats::DoneJobCount).default(0))
                    .col(big_integer(AnalysisStats::FailedJobCount).default(0))
                    .col(integer(AnalysisStats::NumRequiredWorkers).default(0))
                    .col(integer(AnalysisStats::NumRunningWorkers).default(0))
                    .col(integer_null(AnalysisStats::HiveCapacity))
                    .col(integer(AnalysisStats::BatchSize).default(1))
                    .col(integer(AnalysisStats::FailedJobTolerance).default(0))
                    .col(big_integer_null(AnalysisStats::AvgMsecPerJob))
                    .col(boolean(AnalysisStats::SyncLock).default(false))
                    .col(timestamp_null(AnalysisStats::WhenUpdated))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_ANALYSIS_STATS_ANALYSIS)
                            .from(AnalysisStats::Table, AnalysisStats::AnalysisId)
                            .to(AnalysisBase::Table, AnalysisBase::AnalysisId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalysisStats::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum AnalysisStats {
    Table,
    AnalysisId,
    Status,
    TotalJobCount,
    ReadyJobCount,
    SemaphoredJobCount,
    DoneJobCount,
    FailedJobCount,
    NumRequiredWorkers,
    NumRunningWorkers,
    HiveCapacity,
    BatchSize,
    FailedJobTolerance,
    AvgMsecPerJob,
    SyncLock,
    WhenUpdated,
}
