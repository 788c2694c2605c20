//! Declarative test setup.
//!
//! Configuration is queued on the builder and executed during `build()`:
//! tables first (generated from the entity schemas, so tests always match
//! the production models), then fixture rows through the production
//! repositories.

use apiary::data::NewAnalysis;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{DbBackend, EntityTrait, Schema};

use crate::context::TestContext;
use crate::error::TestError;

/// Builder for declarative test initialization.
pub struct TestBuilder {
    include_hive_tables: bool,
    tables: Vec<TableCreateStatement>,
    resource_classes: Vec<String>,
    analyses: Vec<NewAnalysis>,
}

impl TestBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            include_hive_tables: false,
            tables: Vec::new(),
            resource_classes: Vec::new(),
            analyses: Vec::new(),
        }
    }

    /// Queues creation of every hive table.
    pub fn with_hive_tables(mut self) -> Self {
        self.include_hive_tables = true;
        self
    }

    /// Queues creation of one custom entity table.
    pub fn with_table<E: EntityTrait>(mut self, entity: E) -> Self {
        let schema = Schema::new(DbBackend::Sqlite);
        self.tables.push(schema.create_table_from_entity(entity));
        self
    }

    /// Queues insertion of a resource class.
    pub fn with_resource_class(mut self, name: impl Into<String>) -> Self {
        self.resource_classes.push(name.into());
        self
    }

    /// Queues insertion of an analysis (and its statistics row).
    pub fn with_analysis(mut self, new: NewAnalysis) -> Self {
        self.analyses.push(new);
        self
    }

    /// Connects the in-memory database and executes everything queued.
    pub async fn build(self) -> Result<TestContext, TestError> {
        let context = TestContext::new().await?;

        let mut tables = Vec::new();
        if self.include_hive_tables {
            let schema = Schema::new(DbBackend::Sqlite);
            tables.extend([
                schema.create_table_from_entity(entity::prelude::ResourceClass),
                schema.create_table_from_entity(entity::prelude::Analysis),
                schema.create_table_from_entity(entity::prelude::AnalysisStats),
                schema.create_table_from_entity(entity::prelude::Worker),
                schema.create_table_from_entity(entity::prelude::Job),
                schema.create_table_from_entity(entity::prelude::HiveMeta),
            ]);
        }
        tables.extend(self.tables);
        context.with_tables(tables).await?;

        for name in self.resource_classes {
            context.hive().insert_resource_class(&name).await?;
        }

        for new in self.analyses {
            context.hive().insert_analysis(new).await?;
        }

        Ok(context)
    }
}

impl Default for TestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
