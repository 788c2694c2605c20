//! sea-orm entities for the hive database.
//!
//! One module per table. Status and cause-of-death enums are stored as short
//! uppercase strings so that the same schema works on both SQLite and MySQL.

pub mod analysis;
pub mod analysis_stats;
pub mod hive_meta;
pub mod job;
pub mod prelude;
pub mod resource_class;
pub mod worker;
