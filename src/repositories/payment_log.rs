//! # PaymentLog Repository
//!
//! Repository operations for the payment_logs table. The "current plan" of a
//! tenant is its latest complete, unexpired log; plan-change detection looks
//! one row further back.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::payment_log::{ActiveModel, Column, Entity, Model};

/// Fields for a new payment log row.
#[derive(Debug, Clone)]
pub struct NewPaymentLog {
    pub subscriber_id: Uuid,
    pub plan_id: Uuid,
    pub tenant_id: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub coupon_discount_cents: Option<i64>,
    pub starts_at: DateTimeWithTimeZone,
    pub expires_at: Option<DateTimeWithTimeZone>,
}

/// Repository for payment log database operations
#[derive(Debug, Clone)]
pub struct PaymentLogRepository {
    db: DatabaseConnection,
}

impl PaymentLogRepository {
    /// Create a new PaymentLogRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append a payment log row.
    pub async fn create(&self, new: NewPaymentLog) -> Result<Model, RepositoryError> {
        if new.amount_cents < 0 {
            return Err(RepositoryError::validation_error(
                "Payment amount cannot be negative",
            ));
        }

        let log = ActiveModel {
            id: Set(Uuid::new_v4()),
            subscriber_id: Set(new.subscriber_id),
            plan_id: Set(new.plan_id),
            tenant_id: Set(new.tenant_id),
            payment_status: Set(new.payment_status),
            amount_cents: Set(new.amount_cents),
            coupon_discount_cents: Set(new.coupon_discount_cents),
            starts_at: Set(new.starts_at),
            expires_at: Set(new.expires_at),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let result = log.insert(&self.db).await?;

        tracing::info!(
            payment_id = %result.id,
            tenant_id = %result.tenant_id,
            plan_id = %result.plan_id,
            status = %result.payment_status,
            "Payment log created"
        );

        Ok(result)
    }

    /// Find a payment log by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    /// The tenant's current subscription: latest complete, unexpired log.
    pub async fn latest_complete_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Option<Model>, RepositoryError> {
        let now = Utc::now().fixed_offset();

        Ok(Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::PaymentStatus.eq("complete"))
            .filter(
                Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gt(now)),
            )
            .order_by_desc(Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    /// The complete log that preceded `before`, excluding `exclude_id`.
    ///
    /// Used by plan-change detection to find what the tenant was on before
    /// the payment that just completed. Expiry is deliberately ignored: an
    /// upgrade from a lapsed plan is still a plan change.
    pub async fn latest_complete_before(
        &self,
        tenant_id: &str,
        exclude_id: Uuid,
        before: DateTimeWithTimeZone,
    ) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::PaymentStatus.eq("complete"))
            .filter(Column::Id.ne(exclude_id))
            .filter(Column::CreatedAt.lt(before))
            .order_by_desc(Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    /// Transition a payment log to `complete`.
    pub async fn mark_complete(&self, id: Uuid) -> Result<Model, RepositoryError> {
        let log = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Payment '{}' not found", id)))?;

        if log.payment_status == "complete" {
            return Ok(log);
        }

        let mut active: ActiveModel = log.into();
        active.payment_status = Set("complete".to_string());
        let updated = active.update(&self.db).await?;

        tracing::info!(payment_id = %updated.id, tenant_id = %updated.tenant_id, "Payment marked complete");

        Ok(updated)
    }
}
