//! Test context: an in-memory hive plus fixture accessors.

use apiary::Queen;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use crate::error::TestError;
use crate::fixtures::HiveFixtures;

/// A connected in-memory SQLite hive for one test.
pub struct TestContext {
    /// The live connection; shared with every queen and repository the test
    /// constructs.
    pub db: DatabaseConnection,
}

impl TestContext {
    /// Connects a fresh in-memory database.
    pub async fn new() -> Result<Self, TestError> {
        let db = Database::connect("sqlite::memory:").await?;

        Ok(Self { db })
    }

    /// Creates the given tables on this context's database.
    pub async fn with_tables(
        &self,
        tables: Vec<TableCreateStatement>,
    ) -> Result<(), TestError> {
        for table in &tables {
            self.db.execute(table).await?;
        }

        Ok(())
    }

    /// A queen operating on this context's database.
    pub fn queen(&self) -> Queen {
        Queen::new(self.db.clone())
    }

    /// Fixture helpers for inserting and inspecting hive rows.
    pub fn hive(&self) -> HiveFixtures<'_> {
        HiveFixtures::new(&self.db)
    }
}
