//! Resource class repository.

use entity::resource_class;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
};

/// Repository for the `resource_class` table.
pub struct ResourceClassRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ResourceClassRepository<'a, C> {
    /// Creates a new instance of ResourceClassRepository.
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Inserts a resource class with the given name.
    ///
    /// # Arguments
    /// - `name` - Unique resource class name (e.g. "default", "himem")
    ///
    /// # Returns
    /// - `Ok(Model)` - The created resource class with its assigned id
    /// - `Err(DbErr)` - Insertion failed (including unique constraint violation)
    pub async fn create(&self, name: &str) -> Result<resource_class::Model, DbErr> {
        resource_class::ActiveModel {
            name: ActiveValue::Set(name.to_string()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Retrieves a resource class by its id.
    pub async fn fetch_by_id(&self, id: i32) -> Result<Option<resource_class::Model>, DbErr> {
        resource_class::Entity::find_by_id(id).one(self.db).await
    }

    /// Retrieves a resource class by its unique name.
    pub async fn fetch_by_name(&self, name: &str) -> Result<Option<resource_class::Model>, DbErr> {
        resource_class::Entity::find()
            .filter(resource_class::Column::Name.eq(name))
            .one(self.db)
            .await
    }

    /// Retrieves all resource classes.
    pub async fn fetch_all(&self) -> Result<Vec<resource_class::Model>, DbErr> {
        resource_class::Entity::find().all(self.db).await
    }
}
