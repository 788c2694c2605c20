pub use sea_orm_migration::prelude::*;

mod m20260801_000001_create_resource_class_table;
mod m20260801_000002_create_analysis_base_table;
mod m20260801_000003_create_analysis_stats_table;
mod m20260801_000004_create_worker_table;
mod m20260801_000005_create_job_table;
mod m20260801_000006_create_hive_meta_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_resource_class_table::Migration),
            Box::new(m20260801_000002_create_analysis_base_table::Migration),
            Box::new(m20260801_000003_create_analysis_stats_table::Migration),
            Box::new(m20260801_000004_create_worker_table::Migration),
            Box::new(m20260801_000005_create_job_table::Migration),
            Box::new(m20260801_000006_create_hive_meta_table::Migration),
        ]
    }
}
