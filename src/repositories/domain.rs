//! # Domain Repository
//!
//! Repository operations for the domains table.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::domain::{ActiveModel, Column, Entity, Model};

/// Repository for domain database operations
#[derive(Debug, Clone)]
pub struct DomainRepository {
    db: DatabaseConnection,
}

impl DomainRepository {
    /// Create a new DomainRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Bind a hostname to a tenant. Hostnames are unique platform-wide.
    pub async fn create(&self, tenant_id: &str, hostname: &str) -> Result<Model, RepositoryError> {
        let hostname = hostname.trim().to_ascii_lowercase();
        if hostname.is_empty() || !hostname.contains('.') {
            return Err(RepositoryError::validation_error(
                "Hostname is not a valid fully-qualified domain name",
            ));
        }

        let domain = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id.to_string()),
            hostname: Set(hostname.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let result = domain.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!("Hostname '{}' is already bound", hostname))
            } else {
                RepositoryError::database_error(e)
            }
        })?;

        tracing::info!(tenant_id = %tenant_id, hostname = %result.hostname, "Domain bound to tenant");

        Ok(result)
    }

    /// List hostnames bound to a tenant
    pub async fn list_for_tenant(&self, tenant_id: &str) -> Result<Vec<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .all(&self.db)
            .await?)
    }
}
