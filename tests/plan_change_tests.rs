//! Plan-change behavior: upgrades lay down only the gained modules, renewals
//! and downgrades touch nothing.

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Statement};

use landlord::provisioning::NewTenant;
use landlord::repositories::PaymentLogRepository;
use landlord::repositories::payment_log::NewPaymentLog;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{seed_plan, seed_subscriber, setup_env};

/// Provision a ready tenant on the given plan and return its subscriber id.
async fn ready_tenant(
    env: &test_utils::TestEnv,
    subdomain: &str,
    email: &str,
    plan_id: uuid::Uuid,
) -> uuid::Uuid {
    let subscriber_id = seed_subscriber(&env.state, email).await;

    env.state
        .provisioning
        .create_tenant(NewTenant {
            subdomain: subdomain.to_string(),
            subscriber_id,
            plan_id,
            theme: None,
            data: None,
            hostname: None,
        })
        .await
        .unwrap();

    env.state
        .provisioning
        .setup_tenant_database(subdomain)
        .await
        .unwrap();

    subscriber_id
}

/// Append a pending payment for a plan, then complete it through the service.
async fn purchase(
    env: &test_utils::TestEnv,
    subscriber_id: uuid::Uuid,
    tenant_id: &str,
    plan_id: uuid::Uuid,
) -> landlord::provisioning::PaymentCompletionOutcome {
    let payments = PaymentLogRepository::new(env.state.db.clone());

    let log = payments
        .create(NewPaymentLog {
            subscriber_id,
            plan_id,
            tenant_id: tenant_id.to_string(),
            payment_status: "pending".to_string(),
            amount_cents: 4900,
            coupon_discount_cents: None,
            starts_at: Utc::now().fixed_offset(),
            expires_at: Some((Utc::now() + Duration::days(30)).fixed_offset()),
        })
        .await
        .unwrap();

    let payment = payments.mark_complete(log.id).await.unwrap();
    env.state
        .provisioning
        .on_payment_completed(&payment)
        .await
        .unwrap()
}

async fn tenant_has_table(env: &test_utils::TestEnv, tenant: &str, table: &str) -> bool {
    let db = env
        .state
        .provisioning
        .tenant_databases()
        .connect(tenant)
        .await
        .unwrap();
    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!("SELECT COUNT(*) AS n FROM {}", table),
    );
    db.query_one(stmt).await.is_ok()
}

#[tokio::test]
async fn upgrade_lays_down_only_gained_modules() {
    let env = setup_env(|_| {}).await;
    let starter = seed_plan(&env.state, "Starter", "lifetime", 0, &[("blog", true)]).await;
    let business = seed_plan(
        &env.state,
        "Business",
        "monthly",
        4900,
        &[("blog", true), ("event", true)],
    )
    .await;

    let subscriber_id = ready_tenant(&env, "acme", "owner@example.com", starter).await;
    assert!(tenant_has_table(&env, "acme", "blog_posts").await);
    assert!(!tenant_has_table(&env, "acme", "events").await);

    let outcome = purchase(&env, subscriber_id, "acme", business).await;

    assert!(!outcome.job_enqueued);
    assert_eq!(outcome.added_modules, vec!["Event"]);
    assert!(tenant_has_table(&env, "acme", "events").await);
    // Existing module untouched.
    assert!(tenant_has_table(&env, "acme", "blog_posts").await);
}

#[tokio::test]
async fn renewal_on_same_plan_adds_nothing() {
    let env = setup_env(|_| {}).await;
    let starter = seed_plan(&env.state, "Starter", "lifetime", 0, &[("blog", true)]).await;

    let subscriber_id = ready_tenant(&env, "acme", "owner@example.com", starter).await;
    let outcome = purchase(&env, subscriber_id, "acme", starter).await;

    assert!(outcome.added_modules.is_empty());
    assert!(!tenant_has_table(&env, "acme", "events").await);
}

#[tokio::test]
async fn downgrade_never_drops_modules() {
    let env = setup_env(|_| {}).await;
    let business = seed_plan(
        &env.state,
        "Business",
        "lifetime",
        0,
        &[("blog", true), ("event", true)],
    )
    .await;
    let starter = seed_plan(&env.state, "Starter", "monthly", 1900, &[("blog", true)]).await;

    let subscriber_id = ready_tenant(&env, "acme", "owner@example.com", business).await;
    assert!(tenant_has_table(&env, "acme", "events").await);

    let outcome = purchase(&env, subscriber_id, "acme", starter).await;

    // Gain-only: nothing added, and the Event schema stays in place.
    assert!(outcome.added_modules.is_empty());
    assert!(tenant_has_table(&env, "acme", "events").await);
}

#[tokio::test]
async fn upgrade_with_unmapped_features_ignores_them() {
    let env = setup_env(|_| {}).await;
    let starter = seed_plan(&env.state, "Starter", "lifetime", 0, &[("blog", true)]).await;
    // gallery maps to no module; crm is unknown to the catalog.
    let deluxe = seed_plan(
        &env.state,
        "Deluxe",
        "monthly",
        9900,
        &[("blog", true), ("gallery", true), ("crm", true)],
    )
    .await;

    let subscriber_id = ready_tenant(&env, "acme", "owner@example.com", starter).await;
    let outcome = purchase(&env, subscriber_id, "acme", deluxe).await;

    assert!(outcome.added_modules.is_empty());
}

#[tokio::test]
async fn first_payment_upgrades_from_trial_baseline() {
    let env = setup_env(|_| {}).await;
    let business = seed_plan(
        &env.state,
        "Business",
        "monthly",
        4900,
        &[("blog", true), ("event", true)],
    )
    .await;

    // Tenant provisioned while its signup payment is still pending: trial set.
    let subscriber_id = seed_subscriber(&env.state, "trial@example.com").await;
    let creation = env
        .state
        .provisioning
        .create_tenant(NewTenant {
            subdomain: "trialco".to_string(),
            subscriber_id,
            plan_id: business,
            theme: None,
            data: None,
            hostname: None,
        })
        .await
        .unwrap();
    env.state
        .provisioning
        .setup_tenant_database("trialco")
        .await
        .unwrap();
    assert!(!tenant_has_table(&env, "trialco", "blog_posts").await);

    // Completing the signup payment on the now-ready tenant lays down the
    // plan's modules on top of the trial baseline.
    let payments = PaymentLogRepository::new(env.state.db.clone());
    let payment = payments.mark_complete(creation.payment.id).await.unwrap();
    let outcome = env
        .state
        .provisioning
        .on_payment_completed(&payment)
        .await
        .unwrap();

    assert_eq!(outcome.added_modules, vec!["Blog", "Event"]);
    assert!(tenant_has_table(&env, "trialco", "blog_posts").await);
    assert!(tenant_has_table(&env, "trialco", "events").await);
}
