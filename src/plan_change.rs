//! Plan-change detection.
//!
//! When a payment completes for an already-provisioned tenant, compare the
//! module set of the new plan against what the tenant had before and lay down
//! only the gained modules. Downgrades are deliberately one-way at the schema
//! level: modules a tenant loses entitlement to are never dropped here, their
//! data stays in place.

use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::payment_log;
use crate::provisioning::{ProvisionError, ProvisioningService};
use crate::repositories::PaymentLogRepository;

/// What a completed payment changed about a tenant's module set.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PlanChangeOutcome {
    /// Plan the tenant was on before this payment, if any.
    pub previous_plan_id: Option<Uuid>,
    /// Modules newly laid onto the tenant database, sorted.
    pub added_modules: Vec<String>,
}

impl ProvisioningService {
    /// Detect and apply a plan change triggered by a completed payment.
    ///
    /// The previous plan is the complete log that preceded this one,
    /// regardless of expiry; a tenant with no earlier complete log is treated
    /// as having been on the trial module set.
    pub async fn handle_plan_change(
        &self,
        payment: &payment_log::Model,
    ) -> Result<PlanChangeOutcome, ProvisionError> {
        let payments = PaymentLogRepository::new(self.db.clone());

        let previous = payments
            .latest_complete_before(&payment.tenant_id, payment.id, payment.created_at)
            .await?;

        let (previous_plan_id, old_modules) = match previous {
            Some(prev) if prev.plan_id == payment.plan_id => {
                // Renewal on the same plan, nothing to lay down.
                return Ok(PlanChangeOutcome {
                    previous_plan_id: Some(prev.plan_id),
                    added_modules: Vec::new(),
                });
            }
            Some(prev) => match self.modules_for_plan(prev.plan_id).await? {
                Some(modules) => (Some(prev.plan_id), modules),
                None => {
                    // Plan row vanished from under the log; don't block the
                    // payment, treat the baseline as core-only.
                    tracing::warn!(
                        tenant_id = %payment.tenant_id,
                        plan_id = %prev.plan_id,
                        "Previous plan no longer exists, using core modules as baseline"
                    );
                    (Some(prev.plan_id), self.catalog().core_modules().clone())
                }
            },
            None => (None, self.catalog().trial_modules()),
        };

        let new_modules = self
            .modules_for_plan(payment.plan_id)
            .await?
            .ok_or(ProvisionError::PlanNotFound(payment.plan_id))?;

        let added: BTreeSet<String> = new_modules.difference(&old_modules).cloned().collect();

        if added.is_empty() {
            return Ok(PlanChangeOutcome {
                previous_plan_id,
                added_modules: Vec::new(),
            });
        }

        let report = self.apply_added_modules(&payment.tenant_id, &added).await?;

        tracing::info!(
            tenant_id = %payment.tenant_id,
            payment_id = %payment.id,
            added = ?report.applied,
            skipped = ?report.skipped,
            "Plan change applied"
        );

        Ok(PlanChangeOutcome {
            previous_plan_id,
            added_modules: added.into_iter().collect(),
        })
    }
}
