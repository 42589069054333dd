//! Central (landlord) database migrations.
//!
//! This module contains all landlord-schema migrations using SeaORM Migration.
//! Per-tenant module schemas live in the main crate's module registry, not here.

pub use sea_orm_migration::prelude::*;

mod m2024_06_01_000001_create_subscribers;
mod m2024_06_01_000002_create_price_plans;
mod m2024_06_01_000003_create_tenants;
mod m2024_06_01_000004_create_domains;
mod m2024_06_01_000005_create_payment_logs;
mod m2024_06_01_000006_create_provisioning_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_06_01_000001_create_subscribers::Migration),
            Box::new(m2024_06_01_000002_create_price_plans::Migration),
            Box::new(m2024_06_01_000003_create_tenants::Migration),
            Box::new(m2024_06_01_000004_create_domains::Migration),
            Box::new(m2024_06_01_000005_create_payment_logs::Migration),
            Box::new(m2024_06_01_000006_create_provisioning_jobs::Migration),
        ]
    }
}
