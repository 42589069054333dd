//! # Tenant Repository
//!
//! Repository operations for the tenants table. Subdomain validation lives
//! here so every creation path gets the same rules, and the unique-key
//! violation on insert is what closes the check-then-insert race between two
//! concurrent signups for the same subdomain.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::tenant::{ActiveModel, Column, Entity, Model};

/// Maximum subdomain length (DNS label limit).
const MAX_SUBDOMAIN_LEN: usize = 63;

/// Repository for tenant database operations
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Create a new TenantRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a tenant row in `created` state.
    ///
    /// The id is the subdomain. A concurrent insert with the same id surfaces
    /// as a conflict, never as a duplicate row.
    pub async fn create(
        &self,
        id: &str,
        subscriber_id: Uuid,
        theme: Option<&str>,
        data: Option<JsonValue>,
    ) -> Result<Model, RepositoryError> {
        validate_subdomain(id)?;

        let now = Utc::now().fixed_offset();
        let tenant = ActiveModel {
            id: Set(id.to_string()),
            subscriber_id: Set(subscriber_id),
            theme: Set(theme.map(|t| t.to_string())),
            data: Set(data),
            provisioning_status: Set("created".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = tenant.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!("Tenant '{}' already exists", id))
            } else {
                RepositoryError::database_error(e)
            }
        })?;

        tracing::info!(tenant_id = %result.id, subscriber_id = %subscriber_id, "Tenant created");

        Ok(result)
    }

    /// Find a tenant by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Whether a tenant with this id already exists
    pub async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?.is_some())
    }

    /// List all tenants owned by a subscriber
    pub async fn list_for_subscriber(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Vec<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::SubscriberId.eq(subscriber_id))
            .all(&self.db)
            .await?)
    }

    /// Persist a new provisioning lifecycle state for the tenant.
    pub async fn set_provisioning_status(
        &self,
        id: &str,
        status: &str,
    ) -> Result<Model, RepositoryError> {
        let tenant = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Tenant '{}' not found", id)))?;

        let mut active: ActiveModel = tenant.into();
        active.provisioning_status = Set(status.to_string());
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&self.db).await?;

        tracing::info!(tenant_id = %updated.id, status = %updated.provisioning_status, "Tenant provisioning status updated");

        Ok(updated)
    }
}

/// Validate a subdomain-derived tenant id.
///
/// Lowercase letters, digits and hyphens only; must start and end with an
/// alphanumeric character; at most 63 characters.
pub fn validate_subdomain(id: &str) -> Result<(), RepositoryError> {
    if id.is_empty() {
        return Err(RepositoryError::validation_error("Subdomain is required"));
    }
    if id.len() > MAX_SUBDOMAIN_LEN {
        return Err(RepositoryError::validation_error(format!(
            "Subdomain cannot exceed {} characters",
            MAX_SUBDOMAIN_LEN
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(RepositoryError::validation_error(
            "Subdomain may only contain lowercase letters, digits and hyphens",
        ));
    }
    if id.starts_with('-') || id.ends_with('-') {
        return Err(RepositoryError::validation_error(
            "Subdomain cannot start or end with a hyphen",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subdomain_accepts_dns_labels() {
        assert!(validate_subdomain("acme").is_ok());
        assert!(validate_subdomain("acme-east-2").is_ok());
        assert!(validate_subdomain("a1").is_ok());
    }

    #[test]
    fn test_validate_subdomain_rejects_bad_input() {
        assert!(validate_subdomain("").is_err());
        assert!(validate_subdomain("Acme").is_err());
        assert!(validate_subdomain("acme.shop").is_err());
        assert!(validate_subdomain("-acme").is_err());
        assert!(validate_subdomain("acme-").is_err());
        assert!(validate_subdomain(&"a".repeat(64)).is_err());
    }
}
