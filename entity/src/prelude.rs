pub use super::analysis::Entity as Analysis;
pub use super::analysis_stats::Entity as AnalysisStats;
pub use super::hive_meta::Entity as HiveMeta;
pub use super::job::Entity as Job;
pub use super::resource_class::Entity as ResourceClass;
pub use super::worker::Entity as Worker;
