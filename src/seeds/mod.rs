//! Seeding functionality
//!
//! Idempotent bootstrap data: default price plans for the central database
//! and baseline rows for freshly provisioned tenant databases.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};

use crate::repositories::PricePlanRepository;

struct PlanConfig {
    name: &'static str,
    plan_type: &'static str,
    price_cents: i64,
    features: &'static [(&'static str, bool)],
}

/// Seeds the price_plans table with the default plan lineup.
///
/// Existing plans (matched by name) are left untouched, so this is safe to
/// run on every startup.
pub async fn seed_default_plans(db: &DatabaseConnection) -> Result<()> {
    let repo = PricePlanRepository::new(db.clone());

    let plans = [
        PlanConfig {
            name: "Free",
            plan_type: "lifetime",
            price_cents: 0,
            features: &[],
        },
        PlanConfig {
            name: "Starter",
            plan_type: "monthly",
            price_cents: 1900,
            features: &[("blog", true)],
        },
        PlanConfig {
            name: "Business",
            plan_type: "monthly",
            price_cents: 4900,
            features: &[("blog", true), ("event", true), ("gallery", true)],
        },
        PlanConfig {
            name: "Business Yearly",
            plan_type: "yearly",
            price_cents: 49900,
            features: &[("blog", true), ("event", true), ("gallery", true)],
        },
    ];

    for plan in plans {
        match repo.find_by_name(plan.name).await? {
            Some(_) => {
                log::info!("Price plan '{}' already exists, skipping", plan.name);
            }
            None => {
                log::info!("Creating price plan: {}", plan.name);
                repo.create_with_features(
                    plan.name,
                    plan.plan_type,
                    plan.price_cents,
                    plan.features,
                )
                .await?;
            }
        }
    }

    Ok(())
}

/// Write baseline rows into a freshly provisioned tenant database.
///
/// Currently a single settings row recording the tenant's identity; runs
/// after the Core module, so the settings table is guaranteed to exist.
/// Idempotent via upsert-by-key.
pub async fn seed_tenant_defaults(
    tenant_db: &DatabaseConnection,
    tenant_id: &str,
) -> Result<(), DbErr> {
    let payload = serde_json::json!({
        "tenant_id": tenant_id,
        "seeded_at": Utc::now().to_rfc3339(),
    });

    let backend = tenant_db.get_database_backend();
    let stmt = match backend {
        sea_orm::DatabaseBackend::Sqlite => Statement::from_sql_and_values(
            backend,
            "INSERT INTO settings (key, value) VALUES ('tenant.identity', ?) \
             ON CONFLICT(key) DO NOTHING",
            [payload.to_string().into()],
        ),
        _ => Statement::from_sql_and_values(
            backend,
            "INSERT INTO settings (key, value) VALUES ('tenant.identity', $1::jsonb) \
             ON CONFLICT (key) DO NOTHING",
            [payload.to_string().into()],
        ),
    };

    tenant_db.execute(stmt).await?;

    log::info!("Seeded tenant defaults for '{}'", tenant_id);

    Ok(())
}
