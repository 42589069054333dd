//! # PricePlan Repository
//!
//! Repository operations for price plans and their attached features. Feature
//! names are stored lowercase so catalog matching stays case-insensitive.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::plan_feature;
use crate::models::price_plan::{ActiveModel, Column, Entity, Model};

/// Repository for price plan database operations
#[derive(Debug, Clone)]
pub struct PricePlanRepository {
    db: DatabaseConnection,
}

impl PricePlanRepository {
    /// Create a new PricePlanRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a plan together with its feature rows.
    ///
    /// `features` is an ordered list of (name, enabled) pairs; positions are
    /// assigned from list order.
    pub async fn create_with_features(
        &self,
        name: &str,
        plan_type: &str,
        price_cents: i64,
        features: &[(&str, bool)],
    ) -> Result<Model, RepositoryError> {
        if name.trim().is_empty() {
            return Err(RepositoryError::validation_error("Plan name is required"));
        }
        if price_cents < 0 {
            return Err(RepositoryError::validation_error(
                "Plan price cannot be negative",
            ));
        }

        let now = Utc::now().fixed_offset();
        let plan = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            plan_type: Set(plan_type.to_string()),
            price_cents: Set(price_cents),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let plan = plan.insert(&self.db).await?;

        for (position, (feature_name, enabled)) in features.iter().enumerate() {
            let feature = plan_feature::ActiveModel {
                id: Set(Uuid::new_v4()),
                plan_id: Set(plan.id),
                name: Set(feature_name.trim().to_ascii_lowercase()),
                status: Set(*enabled),
                position: Set(position as i32),
            };
            feature.insert(&self.db).await?;
        }

        tracing::info!(plan_id = %plan.id, plan_name = %plan.name, "Price plan created");

        Ok(plan)
    }

    /// Find a plan by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Find a plan by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Model>, RepositoryError> {
        Ok(Entity::find()
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    /// Enabled feature names for a plan, in position order.
    pub async fn enabled_feature_names(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<String>, RepositoryError> {
        let features = plan_feature::Entity::find()
            .filter(plan_feature::Column::PlanId.eq(plan_id))
            .filter(plan_feature::Column::Status.eq(true))
            .order_by_asc(plan_feature::Column::Position)
            .all(&self.db)
            .await?;

        Ok(features.into_iter().map(|f| f.name).collect())
    }
}
