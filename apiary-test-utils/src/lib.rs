#![warn(missing_docs)]

//! Test utilities for apiary integration and unit tests.
//!
//! Provides a declarative [`TestBuilder`] that assembles an in-memory SQLite
//! hive (tables generated from the entity schemas, fixture rows inserted
//! through the production repositories), the [`TestContext`] handed back for
//! imperative fixture work during the test, and a [`MockMeadow`] driver with
//! scripted process tables for exercising the garbage collector and
//! scheduler without any real compute backend.
//!
//! ```ignore
//! use apiary_test_utils::prelude::*;
//!
//! #[tokio::test]
//! async fn my_test() -> Result<(), TestError> {
//!     let test = TestBuilder::new()
//!         .with_hive_tables()
//!         .with_resource_class("default")
//!         .build()
//!         .await?;
//!
//!     let queen = test.queen();
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod meadow;

pub use builder::TestBuilder;
pub use context::TestContext;
pub use error::TestError;
pub use meadow::MockMeadow;

/// Everything a test usually needs.
pub mod prelude {
    pub use super::builder::TestBuilder;
    pub use super::context::TestContext;
    pub use super::error::TestError;
    pub use super::meadow::MockMeadow;
}
