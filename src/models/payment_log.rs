//! PaymentLog entity model
//!
//! This module contains the SeaORM entity model for the payment_logs table.
//! A tenant's current plan is its latest `complete`, unexpired row; rows are
//! append-mostly so plan history stays reconstructable.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// PaymentLog entity representing a subscription purchase or renewal
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_logs")]
pub struct Model {
    /// Unique identifier for the payment log (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Subscriber who made the payment
    pub subscriber_id: Uuid,

    /// Plan that was purchased
    pub plan_id: Uuid,

    /// Tenant the subscription applies to
    pub tenant_id: String,

    /// Payment state: pending, complete, failed, refunded
    pub payment_status: String,

    /// Amount charged in the smallest currency unit
    pub amount_cents: i64,

    /// Discount applied via coupon, if any
    pub coupon_discount_cents: Option<i64>,

    /// Start of the covered subscription period
    pub starts_at: DateTimeWithTimeZone,

    /// End of the covered period; None for lifetime plans
    pub expires_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the payment log was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscriber::Entity",
        from = "Column::SubscriberId",
        to = "super::subscriber::Column::Id"
    )]
    Subscriber,
    #[sea_orm(
        belongs_to = "super::price_plan::Entity",
        from = "Column::PlanId",
        to = "super::price_plan::Column::Id"
    )]
    PricePlan,
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::subscriber::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriber.def()
    }
}

impl Related<super::price_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricePlan.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
