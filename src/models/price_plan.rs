//! PricePlan entity model
//!
//! This module contains the SeaORM entity model for the price_plans table.
//! A plan's billing cadence is carried in `plan_type` (monthly, yearly,
//! lifetime, trial).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// PricePlan entity representing a purchasable subscription plan
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "price_plans")]
pub struct Model {
    /// Unique identifier for the plan (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable plan name
    pub name: String,

    /// Billing cadence (e.g., monthly, yearly, lifetime, trial)
    pub plan_type: String,

    /// Price in the smallest currency unit
    pub price_cents: i64,

    /// Timestamp when the plan was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the plan was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::plan_feature::Entity")]
    PlanFeature,
    #[sea_orm(has_many = "super::payment_log::Entity")]
    PaymentLog,
}

impl Related<super::plan_feature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlanFeature.def()
    }
}

impl Related<super::payment_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
