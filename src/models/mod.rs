//! # Data Models
//!
//! This module contains all the data models used throughout the Landlord API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod domain;
pub mod payment_log;
pub mod plan_feature;
pub mod price_plan;
pub mod provisioning_job;
pub mod subscriber;
pub mod tenant;

pub use domain::Entity as Domain;
pub use payment_log::Entity as PaymentLog;
pub use plan_feature::Entity as PlanFeature;
pub use price_plan::Entity as PricePlan;
pub use provisioning_job::Entity as ProvisioningJob;
pub use subscriber::Entity as Subscriber;
pub use tenant::Entity as Tenant;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "landlord".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
