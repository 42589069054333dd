//! Tenant entity model
//!
//! This module contains the SeaORM entity model for the tenants table. The
//! primary key doubles as the subdomain and as the component substituted into
//! the tenant database URL template.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Tenant entity representing an isolated customer environment
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Subdomain-derived identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Subscriber who owns this tenant
    pub subscriber_id: Uuid,

    /// Optional UI theme selection
    pub theme: Option<String>,

    /// Free-form tenant metadata
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Option<JsonValue>,

    /// Persisted lifecycle state: created, provisioning, ready, failed
    pub provisioning_status: String,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the tenant was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscriber::Entity",
        from = "Column::SubscriberId",
        to = "super::subscriber::Column::Id"
    )]
    Subscriber,
    #[sea_orm(has_many = "super::domain::Entity")]
    Domain,
    #[sea_orm(has_many = "super::payment_log::Entity")]
    PaymentLog,
    #[sea_orm(has_many = "super::provisioning_job::Entity")]
    ProvisioningJob,
}

impl Related<super::subscriber::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriber.def()
    }
}

impl Related<super::domain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Domain.def()
    }
}

impl Related<super::payment_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentLog.def()
    }
}

impl Related<super::provisioning_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProvisioningJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
