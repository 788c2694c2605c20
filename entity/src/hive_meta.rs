use sea_orm::entity::prelude::*;

/// Key/value metadata about the hive itself (schema version, creation time).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hive_meta")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub meta_key: String,
    pub meta_value: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
