//! Subscriber entity model
//!
//! This module contains the SeaORM entity model for the subscribers table,
//! which stores the paying customers of the platform.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Subscriber entity representing a platform customer
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subscribers")]
pub struct Model {
    /// Unique identifier for the subscriber (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login email, unique across the platform
    pub email: String,

    /// Display name (optional)
    pub name: Option<String>,

    /// Whether the subscriber already owns a tenant
    pub has_tenant: bool,

    /// Timestamp when the subscriber was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the subscriber was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tenant::Entity")]
    Tenant,
    #[sea_orm(has_many = "super::payment_log::Entity")]
    PaymentLog,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::payment_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
