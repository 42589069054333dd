//! # ProvisioningJob Repository
//!
//! Repository operations for the provisioning_jobs queue. The provisioner
//! claims jobs through here; claiming flips a job to `running` and bumps the
//! attempt counter in one update.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::provisioning_job::{ActiveModel, Column, Entity, Model};

/// Repository for provisioning job database operations
#[derive(Debug, Clone)]
pub struct ProvisioningJobRepository {
    db: DatabaseConnection,
}

impl ProvisioningJobRepository {
    /// Create a new ProvisioningJobRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Enqueue a provisioning run for a tenant.
    pub async fn enqueue(&self, tenant_id: &str) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id.to_string()),
            status: Set("queued".to_string()),
            attempts: Set(0),
            scheduled_at: Set(now),
            started_at: Set(None),
            finished_at: Set(None),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = job.insert(&self.db).await?;

        tracing::info!(tenant_id = %tenant_id, job_id = %result.id, "Provisioning job enqueued");

        Ok(result)
    }

    /// Claim the next due queued job, marking it running.
    ///
    /// Returns None when the queue is empty. The claim is a read-then-update;
    /// a single provisioner instance is assumed per deployment.
    pub async fn claim_next_queued(&self) -> Result<Option<Model>, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let Some(job) = Entity::find()
            .filter(Column::Status.eq("queued"))
            .filter(Column::ScheduledAt.lte(now))
            .order_by_asc(Column::ScheduledAt)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let attempts = job.attempts + 1;
        let mut active: ActiveModel = job.into();
        active.status = Set("running".to_string());
        active.attempts = Set(attempts);
        active.started_at = Set(Some(now));
        active.updated_at = Set(now);

        Ok(Some(active.update(&self.db).await?))
    }

    /// Mark a job finished successfully.
    pub async fn mark_succeeded(&self, id: Uuid) -> Result<Model, RepositoryError> {
        self.finish(id, "succeeded", None).await
    }

    /// Mark a job failed with structured error details.
    pub async fn mark_failed(&self, id: Uuid, error: JsonValue) -> Result<Model, RepositoryError> {
        self.finish(id, "failed", Some(error)).await
    }

    async fn finish(
        &self,
        id: Uuid,
        status: &str,
        error: Option<JsonValue>,
    ) -> Result<Model, RepositoryError> {
        let job = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("Provisioning job '{}' not found", id))
            })?;

        let now = Utc::now().fixed_offset();
        let mut active: ActiveModel = job.into();
        active.status = Set(status.to_string());
        active.finished_at = Set(Some(now));
        active.updated_at = Set(now);
        if let Some(err) = error {
            active.error = Set(Some(err));
        }

        Ok(active.update(&self.db).await?)
    }

    /// Latest job for a tenant, newest first.
    pub async fn find_latest_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .order_by_desc(Column::CreatedAt)
            .one(&self.db)
            .await?)
    }
}
