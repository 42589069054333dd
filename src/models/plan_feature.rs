//! PlanFeature entity model
//!
//! Features attached to a price plan. Feature names are matched against the
//! feature catalog to decide which tenant modules a plan grants.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "plan_features")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Plan this feature belongs to
    pub plan_id: Uuid,

    /// Feature name, stored lowercase
    pub name: String,

    /// Whether the feature is currently enabled on the plan
    pub status: bool,

    /// Ordering position within the plan
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::price_plan::Entity",
        from = "Column::PlanId",
        to = "super::price_plan::Column::Id"
    )]
    PricePlan,
}

impl Related<super::price_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricePlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
