use sea_orm::entity::prelude::*;

/// One pipeline stage. Workers specialize into exactly one analysis and then
/// pull that analysis' jobs until told otherwise.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "analysis_base")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub analysis_id: i32,
    #[sea_orm(unique)]
    pub logic_name: String,
    pub resource_class_id: i32,
    /// Pins the analysis to one compute backend; `None` means the default meadow.
    pub meadow_type: Option<String>,
    /// Scheduling priority, higher first.
    pub priority: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::resource_class::Entity",
        from = "Column::ResourceClassId",
        to = "super::resource_class::Column::ResourceClassId"
    )]
    ResourceClass,
    #[sea_orm(has_one = "super::analysis_stats::Entity")]
    AnalysisStats,
    #[sea_orm(has_many = "super::job::Entity")]
    Job,
    #[sea_orm(has_many = "super::worker::Entity")]
    Worker,
}

impl Related<super::resource_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResourceClass.def()
    }
}

impl Related<super::analysis_stats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalysisStats.def()
    }
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl Related<super::worker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Worker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
