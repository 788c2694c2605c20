use sea_orm_migration::{prelude::*, schema::*};

/// Schema version stamped into hive_meta so running tools can refuse to talk
/// to a hive created by an incompatible release.
static HIVE_SCHEMA_VERSION: &str = "1";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HiveMeta::Table)
                    .if_not_exists()
                    .col(string(HiveMeta::MetaKey).primary_key())
                    .col(string_null(HiveMeta::MetaValue))
                    .to_owned(),
            )
            .await?;

        let insert = Query::insert()
            .into_table(HiveMeta::Table)
            .columns([HiveMeta::MetaKey, HiveMeta::MetaValue])
            .values_panic(["hive_sql_schema_version".into(), HIVE_SCHEMA_VERSION.into()])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HiveMeta::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum HiveMeta {
    Table,
    MetaKey,
    MetaValue,
}
