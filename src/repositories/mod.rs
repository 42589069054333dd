//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access. Repositories are
//! constructed with an explicit connection handle and injected into services rather
//! than resolved from ambient state.

pub mod domain;
pub mod payment_log;
pub mod price_plan;
pub mod provisioning_job;
pub mod subscriber;
pub mod tenant;

pub use domain::DomainRepository;
pub use payment_log::PaymentLogRepository;
pub use price_plan::PricePlanRepository;
pub use provisioning_job::ProvisioningJobRepository;
pub use subscriber::SubscriberRepository;
pub use tenant::TenantRepository;
