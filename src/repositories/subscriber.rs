//! # Subscriber Repository
//!
//! Repository operations for the subscribers table.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::subscriber::{ActiveModel, Column, Entity, Model};

/// Repository for subscriber database operations
#[derive(Debug, Clone)]
pub struct SubscriberRepository {
    db: DatabaseConnection,
}

impl SubscriberRepository {
    /// Create a new SubscriberRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a subscriber. Duplicate emails map to a conflict.
    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Model, RepositoryError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(RepositoryError::validation_error(
                "Subscriber email is not valid",
            ));
        }

        let now = Utc::now().fixed_offset();
        let subscriber = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            name: Set(name.map(|n| n.to_string())),
            has_tenant: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = subscriber.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!("Subscriber '{}' already exists", email))
            } else {
                RepositoryError::database_error(e)
            }
        })?;

        tracing::info!(subscriber_id = %result.id, "Subscriber created");

        Ok(result)
    }

    /// Find a subscriber by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Find a subscriber by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::Email.eq(email.trim().to_ascii_lowercase()))
            .one(&self.db)
            .await?)
    }

    /// Mark the subscriber as owning a tenant
    pub async fn mark_has_tenant(&self, id: Uuid) -> Result<Model, RepositoryError> {
        let subscriber = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Subscriber '{}' not found", id)))?;

        let mut active: ActiveModel = subscriber.into();
        active.has_tenant = Set(true);
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?)
    }
}
