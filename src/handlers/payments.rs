//! # Payments API Handlers
//!
//! Payment completion is the trigger for everything downstream: the first
//! completed payment of an unprovisioned tenant queues its provisioning run,
//! and a completed payment on a live tenant runs plan-change detection.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::handlers::tenants::TenantApiResponse;
use crate::provisioning::ProvisionError;
use crate::repositories::PaymentLogRepository;
use crate::server::AppState;

/// Response payload for payment completion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentCompletionResponseDto {
    /// The completed payment
    pub payment_id: Uuid,
    /// Payment state after completion
    #[schema(example = "complete")]
    pub payment_status: String,
    /// Whether completion queued the initial provisioning run
    pub job_enqueued: bool,
    /// Modules newly laid onto the tenant database by a plan change
    pub added_modules: Vec<String>,
}

/// Complete a pending payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/complete",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Payment log UUID")
    ),
    responses(
        (status = 200, description = "Payment completed", body = TenantApiResponse<PaymentCompletionResponseDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Payment not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "payments"
)]
pub async fn complete_payment(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<TenantApiResponse<PaymentCompletionResponseDto>>, ApiError> {
    let trace_id = crate::telemetry::current_trace_id()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let payments = PaymentLogRepository::new(state.db.clone());

    let payment = payments
        .find_by_id(payment_id)
        .await?
        .ok_or(ProvisionError::PaymentNotFound(payment_id))?;
    let payment = payments.mark_complete(payment.id).await?;
    let outcome = state.provisioning.on_payment_completed(&payment).await?;

    let response_data = PaymentCompletionResponseDto {
        payment_id: payment.id,
        payment_status: payment.payment_status,
        job_enqueued: outcome.job_enqueued,
        added_modules: outcome.added_modules,
    };

    Ok(Json(TenantApiResponse {
        data: response_data,
        meta: crate::handlers::tenants::TenantResponseMeta {
            request_id: trace_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::Database;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::repositories::{PricePlanRepository, SubscriberRepository};
    use crate::server::AppState;
    use migration::{Migrator, MigratorTrait};

    async fn setup() -> (AppState, axum::Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let central_url = format!(
            "sqlite://{}/central.sqlite?mode=rwc",
            dir.path().display()
        );

        let config = AppConfig {
            profile: "test".to_string(),
            operator_tokens: vec!["test-token".to_string()],
            database_url: central_url.clone(),
            tenant_database_url_template: format!(
                "sqlite://{}/tenants/{{tenant}}.sqlite?mode=rwc",
                dir.path().display()
            ),
            ..Default::default()
        };

        let db = Database::connect(&central_url).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let state = AppState::new(Arc::new(config), db);
        let app = crate::server::create_app(state.clone());
        (state, app, dir)
    }

    fn complete_request(payment_id: Uuid, subscriber_id: Uuid) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/payments/{}/complete", payment_id))
            .header("Authorization", "Bearer test-token")
            .header("X-Subscriber-Id", subscriber_id.to_string())
            .header("Content-Type", "application/json")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_payment_enqueues_provisioning() {
        let (state, app, _dir) = setup().await;

        let subscriber = SubscriberRepository::new(state.db.clone())
            .create("buyer@example.com", None)
            .await
            .unwrap();
        let plan = PricePlanRepository::new(state.db.clone())
            .create_with_features("Paid", "monthly", 1900, &[("blog", true)])
            .await
            .unwrap();

        let creation = state
            .provisioning
            .create_tenant(crate::provisioning::NewTenant {
                subdomain: "acme".to_string(),
                subscriber_id: subscriber.id,
                plan_id: plan.id,
                theme: None,
                data: None,
                hostname: None,
            })
            .await
            .unwrap();

        // Paid plan: payment pending, provisioning queued for the trial set.
        assert_eq!(creation.payment.payment_status, "pending");
        assert_eq!(creation.job.status, "queued");

        let response = app
            .oneshot(complete_request(creation.payment.id, subscriber.id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let response_json: TenantApiResponse<PaymentCompletionResponseDto> =
            serde_json::from_slice(&body).unwrap();

        assert_eq!(response_json.data.payment_status, "complete");
        assert!(response_json.data.job_enqueued);
        assert!(response_json.data.added_modules.is_empty());
    }

    #[tokio::test]
    async fn test_complete_unknown_payment_404() {
        let (_state, app, _dir) = setup().await;

        let response = app
            .oneshot(complete_request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
