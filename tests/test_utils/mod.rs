//! Shared helpers for integration tests: a temp-dir-backed central database
//! with migrations applied, plus seed shortcuts.

use std::sync::Arc;

use sea_orm::Database;
use uuid::Uuid;

use landlord::config::AppConfig;
use landlord::migration::{Migrator, MigratorTrait};
use landlord::repositories::{PricePlanRepository, SubscriberRepository};
use landlord::server::AppState;

pub struct TestEnv {
    pub state: AppState,
    // Keeps the sqlite files alive for the duration of the test.
    _dir: tempfile::TempDir,
}

pub async fn setup_env(mutate: impl FnOnce(&mut AppConfig)) -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let central_url = format!("sqlite://{}/central.sqlite?mode=rwc", dir.path().display());

    let mut config = AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec!["test-token".to_string()],
        database_url: central_url.clone(),
        tenant_database_url_template: format!(
            "sqlite://{}/tenants/{{tenant}}.sqlite?mode=rwc",
            dir.path().display()
        ),
        ..Default::default()
    };
    mutate(&mut config);

    let db = Database::connect(&central_url)
        .await
        .expect("Failed to connect test DB");
    Migrator::up(&db, None).await.expect("Migrations failed");

    TestEnv {
        state: AppState::new(Arc::new(config), db),
        _dir: dir,
    }
}

pub async fn seed_subscriber(state: &AppState, email: &str) -> Uuid {
    SubscriberRepository::new(state.db.clone())
        .create(email, None)
        .await
        .expect("Failed to seed subscriber")
        .id
}

pub async fn seed_plan(
    state: &AppState,
    name: &str,
    plan_type: &str,
    price_cents: i64,
    features: &[(&str, bool)],
) -> Uuid {
    PricePlanRepository::new(state.db.clone())
        .create_with_features(name, plan_type, price_cents, features)
        .await
        .expect("Failed to seed plan")
        .id
}
