//! # Landlord API Library
//!
//! This library provides the core functionality for the Landlord API service:
//! subscriber/plan/tenant management, tenant database provisioning, and the
//! plan-driven module migration policy.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod modules;
pub mod plan_change;
pub mod provisioning;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod tenant_db;
pub mod tokens;
pub mod worker;
pub use migration;
