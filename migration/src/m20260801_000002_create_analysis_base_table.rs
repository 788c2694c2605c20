use sea_orm_migration::{prelude::*, schema::*};

use crate::m20260801_000001_create_resource_class_table::ResourceClass;

static FK_ANALYSIS_RESOURCE_CLASS: &str = "fk_analysis_base_resource_class";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalysisBase::Table)
                    .if_not_exists()
                    .col(pk_auto(AnalysisBase::AnalysisId))
                    .col(string_uniq(AnalysisBase::LogicName))
                    .col(integer(AnalysisBase::ResourceClassId))
                    .col(string_null(AnalysisBase::MeadowType))
                    .col(integer(AnalysisBase::Priority).default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_ANALYSIS_RESOURCE_CLASS)
                            .from(AnalysisBase::Table, AnalysisBase::ResourceClassId)
                            .to(ResourceClass::Table, ResourceClass::ResourceClassId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalysisBase::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum AnalysisBase {
    Table,
    AnalysisId,
    LogicName,
    ResourceClassId,
    MeadowType,
    Priority,
}
