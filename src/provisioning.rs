//! Tenant provisioning service.
//!
//! Owns the tenant lifecycle: signup creates the tenant record, its payment
//! log and a queued provisioning job; the provisioner (or an explicit setup
//! call) then creates the physical tenant database and lays down the module
//! schemas the tenant's plan grants. Lifecycle state is persisted on the
//! tenant row so crashed runs stay visible as `failed` instead of silently
//! looking fresh.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::FeatureCatalog;
use crate::config::AppConfig;
use crate::error::{ApiError, RepositoryError};
use crate::models::{payment_log, provisioning_job, tenant};
use crate::modules::{self, ModuleRunReport};
use crate::repositories::payment_log::NewPaymentLog;
use crate::repositories::{
    DomainRepository, PaymentLogRepository, PricePlanRepository, ProvisioningJobRepository,
    SubscriberRepository, TenantRepository,
};
use crate::tenant_db::{TenantDatabases, TenantDbError};

/// Persisted tenant lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningStatus {
    Created,
    Provisioning,
    Ready,
    Failed,
}

impl ProvisioningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStatus::Created => "created",
            ProvisioningStatus::Provisioning => "provisioning",
            ProvisioningStatus::Ready => "ready",
            ProvisioningStatus::Failed => "failed",
        }
    }
}

impl FromStr for ProvisioningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ProvisioningStatus::Created),
            "provisioning" => Ok(ProvisioningStatus::Provisioning),
            "ready" => Ok(ProvisioningStatus::Ready),
            "failed" => Ok(ProvisioningStatus::Failed),
            other => Err(format!("unknown provisioning status '{}'", other)),
        }
    }
}

/// Errors produced by provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("subscriber '{0}' not found")]
    SubscriberNotFound(Uuid),
    #[error("price plan '{0}' not found")]
    PlanNotFound(Uuid),
    #[error("tenant '{0}' not found")]
    TenantNotFound(String),
    #[error("payment '{0}' not found")]
    PaymentNotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("tenant database error: {0}")]
    TenantDb(#[from] TenantDbError),
    #[error("module migration failed: {0}")]
    ModuleMigration(sea_orm::DbErr),
}

impl From<ProvisionError> for ApiError {
    fn from(error: ProvisionError) -> Self {
        match error {
            ProvisionError::SubscriberNotFound(_)
            | ProvisionError::PlanNotFound(_)
            | ProvisionError::TenantNotFound(_)
            | ProvisionError::PaymentNotFound(_) => {
                ApiError::new(axum::http::StatusCode::NOT_FOUND, "NOT_FOUND", &error.to_string())
            }
            ProvisionError::Repository(inner) => inner.into(),
            ProvisionError::TenantDb(inner) => {
                tracing::error!("Tenant database operation failed: {}", inner);
                ApiError::new(
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "PROVISIONING_FAILED",
                    "Tenant database operation failed",
                )
            }
            ProvisionError::ModuleMigration(inner) => {
                tracing::error!("Module migration failed: {}", inner);
                ApiError::new(
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "PROVISIONING_FAILED",
                    "Module migration failed",
                )
            }
        }
    }
}

/// Parameters for a tenant signup.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub subdomain: String,
    pub subscriber_id: Uuid,
    pub plan_id: Uuid,
    pub theme: Option<String>,
    pub data: Option<JsonValue>,
    pub hostname: Option<String>,
}

/// What a signup produced.
#[derive(Debug, Clone)]
pub struct TenantCreation {
    pub tenant: tenant::Model,
    pub payment: payment_log::Model,
    pub job: provisioning_job::Model,
}

/// Snapshot of a tenant's provisioning state for status queries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TenantDatabaseStatus {
    pub tenant_id: String,
    pub provisioning_status: ProvisioningStatus,
    pub database_exists: bool,
    pub expected_modules: Vec<String>,
    pub last_job_status: Option<String>,
}

/// Outcome of completing a payment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentCompletionOutcome {
    pub payment_id: Uuid,
    /// Set when completion enqueued the initial provisioning run.
    pub job_enqueued: bool,
    /// Modules added as a result of a plan change, if any.
    pub added_modules: Vec<String>,
}

/// Coordinates tenant signup, database provisioning and plan changes.
pub struct ProvisioningService {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) catalog: FeatureCatalog,
    pub(crate) tenant_dbs: TenantDatabases,
}

impl ProvisioningService {
    pub fn new(db: DatabaseConnection, config: Arc<AppConfig>) -> Self {
        let catalog = FeatureCatalog::from_config(&config);
        let tenant_dbs = TenantDatabases::new(&config);
        Self {
            db,
            config,
            catalog,
            tenant_dbs,
        }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn tenant_databases(&self) -> &TenantDatabases {
        &self.tenant_dbs
    }

    /// Create a tenant for a subscriber on a plan.
    ///
    /// Writes the tenant row (status `created`), binds the optional hostname,
    /// appends the payment log, marks the subscriber as a tenant owner and
    /// enqueues the provisioning run. Zero-amount plans complete their
    /// payment immediately; paid plans stay `pending`, so the initial run
    /// provisions the trial module set and the completed payment later lays
    /// the plan's modules on top.
    pub async fn create_tenant(&self, new: NewTenant) -> Result<TenantCreation, ProvisionError> {
        let subscribers = SubscriberRepository::new(self.db.clone());
        let plans = PricePlanRepository::new(self.db.clone());
        let tenants = TenantRepository::new(self.db.clone());
        let payments = PaymentLogRepository::new(self.db.clone());
        let jobs = ProvisioningJobRepository::new(self.db.clone());

        let subscriber = subscribers
            .find_by_id(new.subscriber_id)
            .await?
            .ok_or(ProvisionError::SubscriberNotFound(new.subscriber_id))?;

        let plan = plans
            .find_by_id(new.plan_id)
            .await?
            .ok_or(ProvisionError::PlanNotFound(new.plan_id))?;

        // Insert first; the primary key closes the duplicate-subdomain race.
        let tenant = tenants
            .create(
                &new.subdomain,
                subscriber.id,
                new.theme.as_deref(),
                new.data.clone(),
            )
            .await?;

        if let Some(hostname) = new.hostname.as_deref() {
            DomainRepository::new(self.db.clone())
                .create(&tenant.id, hostname)
                .await?;
        }

        let now = Utc::now().fixed_offset();
        let amount = plan.price_cents;
        let status = if amount == 0 { "complete" } else { "pending" };

        let payment = payments
            .create(NewPaymentLog {
                subscriber_id: subscriber.id,
                plan_id: plan.id,
                tenant_id: tenant.id.clone(),
                payment_status: status.to_string(),
                amount_cents: amount,
                coupon_discount_cents: None,
                starts_at: now,
                expires_at: expiry_for_plan_type(&plan.plan_type),
            })
            .await?;

        subscribers.mark_has_tenant(subscriber.id).await?;

        let job = jobs.enqueue(&tenant.id).await?;

        tracing::info!(
            tenant_id = %tenant.id,
            subscriber_id = %subscriber.id,
            plan_id = %plan.id,
            payment_status = %payment.payment_status,
            job_id = %job.id,
            "Tenant signup completed"
        );

        Ok(TenantCreation {
            tenant,
            payment,
            job,
        })
    }

    /// Create and migrate the tenant's physical database.
    ///
    /// Safe to call repeatedly: database creation and module migrations are
    /// both idempotent. Any failure persists `failed` on the tenant row
    /// before the error propagates.
    pub async fn setup_tenant_database(
        &self,
        tenant_id: &str,
    ) -> Result<ModuleRunReport, ProvisionError> {
        let tenants = TenantRepository::new(self.db.clone());

        let tenant = tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| ProvisionError::TenantNotFound(tenant_id.to_string()))?;

        tenants
            .set_provisioning_status(&tenant.id, ProvisioningStatus::Provisioning.as_str())
            .await?;

        match self.run_setup(&tenant).await {
            Ok(report) => {
                tenants
                    .set_provisioning_status(&tenant.id, ProvisioningStatus::Ready.as_str())
                    .await?;
                tracing::info!(
                    tenant_id = %tenant.id,
                    applied = ?report.applied,
                    skipped = ?report.skipped,
                    "Tenant database provisioned"
                );
                Ok(report)
            }
            Err(e) => {
                // Best effort; the original failure is the one worth surfacing.
                if let Err(status_err) = tenants
                    .set_provisioning_status(&tenant.id, ProvisioningStatus::Failed.as_str())
                    .await
                {
                    tracing::error!(
                        tenant_id = %tenant.id,
                        "Failed to record failed provisioning status: {}",
                        status_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_setup(&self, tenant: &tenant::Model) -> Result<ModuleRunReport, ProvisionError> {
        self.tenant_dbs.create_if_absent(&self.db, &tenant.id).await?;

        let modules = self.enabled_modules_for(&tenant.id).await?;
        let tenant_db = self.tenant_dbs.connect(&tenant.id).await?;

        let report = modules::run_modules(&tenant_db, &modules)
            .await
            .map_err(ProvisionError::ModuleMigration)?;

        if self.config.seed_tenant_data {
            crate::seeds::seed_tenant_defaults(&tenant_db, &tenant.id)
                .await
                .map_err(ProvisionError::ModuleMigration)?;
        }

        Ok(report)
    }

    /// Module set the tenant is currently entitled to.
    ///
    /// Derived from the latest complete, unexpired payment; tenants without
    /// one get the trial module set.
    pub async fn enabled_modules_for(
        &self,
        tenant_id: &str,
    ) -> Result<BTreeSet<String>, ProvisionError> {
        let payments = PaymentLogRepository::new(self.db.clone());
        let plans = PricePlanRepository::new(self.db.clone());

        match payments.latest_complete_for_tenant(tenant_id).await? {
            Some(log) => {
                let features = plans.enabled_feature_names(log.plan_id).await?;
                Ok(self.catalog.modules_for_features(&features))
            }
            None => Ok(self.catalog.trial_modules()),
        }
    }

    /// Module set a specific plan grants.
    pub async fn modules_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Option<BTreeSet<String>>, ProvisionError> {
        let plans = PricePlanRepository::new(self.db.clone());
        if plans.find_by_id(plan_id).await?.is_none() {
            return Ok(None);
        }
        let features = plans.enabled_feature_names(plan_id).await?;
        Ok(Some(self.catalog.modules_for_features(&features)))
    }

    /// Lay additional modules onto an existing tenant database.
    pub async fn apply_added_modules(
        &self,
        tenant_id: &str,
        added: &BTreeSet<String>,
    ) -> Result<ModuleRunReport, ProvisionError> {
        self.tenant_dbs.create_if_absent(&self.db, tenant_id).await?;
        let tenant_db = self.tenant_dbs.connect(tenant_id).await?;

        modules::run_modules(&tenant_db, added)
            .await
            .map_err(ProvisionError::ModuleMigration)
    }

    /// Whether the tenant's physical database exists. Probe errors read as
    /// "no".
    pub async fn database_exists(&self, tenant_id: &str) -> bool {
        self.tenant_dbs.exists(tenant_id).await
    }

    /// Status snapshot for the database-status endpoint.
    pub async fn database_status(
        &self,
        tenant_id: &str,
    ) -> Result<TenantDatabaseStatus, ProvisionError> {
        let tenants = TenantRepository::new(self.db.clone());
        let jobs = ProvisioningJobRepository::new(self.db.clone());

        let tenant = tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| ProvisionError::TenantNotFound(tenant_id.to_string()))?;

        let provisioning_status = ProvisioningStatus::from_str(&tenant.provisioning_status)
            .unwrap_or(ProvisioningStatus::Created);
        let expected_modules = self
            .enabled_modules_for(&tenant.id)
            .await?
            .into_iter()
            .collect();
        let last_job = jobs.find_latest_for_tenant(&tenant.id).await?;

        Ok(TenantDatabaseStatus {
            tenant_id: tenant.id,
            provisioning_status,
            database_exists: self.database_exists(tenant_id).await,
            expected_modules,
            last_job_status: last_job.map(|j| j.status),
        })
    }

    /// React to a payment transitioning to `complete`.
    ///
    /// For tenants that are not yet provisioned this queues the initial
    /// provisioning run; for live tenants it runs plan-change detection and
    /// lays any newly granted modules.
    pub async fn on_payment_completed(
        &self,
        payment: &payment_log::Model,
    ) -> Result<PaymentCompletionOutcome, ProvisionError> {
        let tenants = TenantRepository::new(self.db.clone());
        let jobs = ProvisioningJobRepository::new(self.db.clone());

        let tenant = tenants
            .find_by_id(&payment.tenant_id)
            .await?
            .ok_or_else(|| ProvisionError::TenantNotFound(payment.tenant_id.clone()))?;

        let status = ProvisioningStatus::from_str(&tenant.provisioning_status)
            .unwrap_or(ProvisioningStatus::Created);

        if status != ProvisioningStatus::Ready {
            let job = jobs.enqueue(&tenant.id).await?;
            tracing::info!(
                tenant_id = %tenant.id,
                payment_id = %payment.id,
                job_id = %job.id,
                "Payment completed for unprovisioned tenant, provisioning enqueued"
            );
            return Ok(PaymentCompletionOutcome {
                payment_id: payment.id,
                job_enqueued: true,
                added_modules: Vec::new(),
            });
        }

        let outcome = self.handle_plan_change(payment).await?;

        Ok(PaymentCompletionOutcome {
            payment_id: payment.id,
            job_enqueued: false,
            added_modules: outcome.added_modules,
        })
    }

    /// Record a structured failure on a job and mark the tenant failed.
    pub(crate) async fn record_job_failure(
        &self,
        job_id: Uuid,
        tenant_id: &str,
        error: &ProvisionError,
    ) {
        let jobs = ProvisioningJobRepository::new(self.db.clone());
        let tenants = TenantRepository::new(self.db.clone());

        let details = json!({ "message": error.to_string() });
        if let Err(e) = jobs.mark_failed(job_id, details).await {
            tracing::error!(job_id = %job_id, "Failed to mark provisioning job failed: {}", e);
        }
        if let Err(e) = tenants
            .set_provisioning_status(tenant_id, ProvisioningStatus::Failed.as_str())
            .await
        {
            tracing::error!(tenant_id = %tenant_id, "Failed to mark tenant failed: {}", e);
        }
    }
}

/// Subscription expiry for a plan's billing cadence.
fn expiry_for_plan_type(plan_type: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let now = Utc::now();
    let expires = match plan_type {
        "monthly" => now + Duration::days(30),
        "yearly" => now + Duration::days(365),
        "trial" => now + Duration::days(14),
        // lifetime and anything unrecognized never expires
        _ => return None,
    };
    Some(expires.fixed_offset())
}
