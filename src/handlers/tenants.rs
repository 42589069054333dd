//! # Tenants API Handlers
//!
//! This module contains handlers for tenant signup, status inspection,
//! explicit database setup and tenant token issuance.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, SubscriberExtension};
use crate::error::ApiError;
use crate::models::tenant;
use crate::provisioning::{NewTenant, TenantDatabaseStatus};
use crate::repositories::TenantRepository;
use crate::server::AppState;
use crate::telemetry::current_trace_id;
use crate::tokens::TenantToken;

/// Request payload for creating a new tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTenantRequestDto {
    /// Subdomain-derived tenant identifier (lowercase letters, digits, hyphens)
    #[schema(example = "acme")]
    pub subdomain: String,
    /// Price plan the tenant signs up on
    pub plan_id: Uuid,
    /// Optional UI theme selection
    pub theme: Option<String>,
    /// Optional free-form tenant metadata
    pub data: Option<serde_json::Value>,
    /// Optional custom hostname to bind to the tenant
    #[schema(example = "shop.acme.com")]
    pub hostname: Option<String>,
}

/// Tenant representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponseDto {
    /// Tenant identifier (subdomain)
    #[schema(example = "acme")]
    pub id: String,
    /// Owning subscriber
    pub subscriber_id: Uuid,
    /// Persisted lifecycle state
    #[schema(example = "created")]
    pub provisioning_status: String,
    /// UI theme selection
    pub theme: Option<String>,
    /// Free-form tenant metadata
    pub data: Option<serde_json::Value>,
    /// Timestamp when the tenant was created (ISO 8601)
    pub created_at: String,
}

impl From<tenant::Model> for TenantResponseDto {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            subscriber_id: model.subscriber_id,
            provisioning_status: model.provisioning_status,
            theme: model.theme,
            data: model.data,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Response payload for tenant creation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantCreationResponseDto {
    /// The created tenant
    pub tenant: TenantResponseDto,
    /// Payment log recorded for the signup
    pub payment_id: Uuid,
    /// Payment state after signup (complete for zero-amount plans)
    #[schema(example = "complete")]
    pub payment_status: String,
    /// Provisioning job queued by the signup
    pub job_id: Uuid,
}

/// Response payload for an explicit database setup run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetupDatabaseResponseDto {
    /// Tenant the run applied to
    pub tenant_id: String,
    /// Modules whose migrations ran
    pub applied: Vec<String>,
    /// Module ids that were not recognized
    pub skipped: Vec<String>,
}

/// Standard API response wrapper for tenant operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response metadata
    pub meta: TenantResponseMeta,
}

/// Response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponseMeta {
    /// Unique request identifier for tracing
    pub request_id: String,
    /// Response timestamp (ISO 8601)
    pub timestamp: String,
}

fn wrap<T>(data: T, trace_id: &str) -> TenantApiResponse<T> {
    TenantApiResponse {
        data,
        meta: TenantResponseMeta {
            request_id: trace_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        },
    }
}

fn request_trace_id() -> String {
    current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Create a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    security(("bearer_auth" = [])),
    request_body = CreateTenantRequestDto,
    responses(
        (status = 201, description = "Tenant created successfully", body = TenantApiResponse<TenantCreationResponseDto>, headers(
            ("Location", description = "URL of the created tenant"),
            ("X-Trace-Id", description = "Trace identifier for request correlation")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Subscriber or plan not found", body = ApiError),
        (status = 409, description = "Subdomain already taken", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    SubscriberExtension(subscriber): SubscriberExtension,
    Json(request): Json<CreateTenantRequestDto>,
) -> Result<
    (
        StatusCode,
        [(&'static str, String); 2],
        Json<TenantApiResponse<TenantCreationResponseDto>>,
    ),
    ApiError,
> {
    let trace_id = request_trace_id();

    let creation = state
        .provisioning
        .create_tenant(NewTenant {
            subdomain: request.subdomain.trim().to_string(),
            subscriber_id: subscriber.0,
            plan_id: request.plan_id,
            theme: request.theme,
            data: request.data,
            hostname: request.hostname,
        })
        .await?;

    let location_header = format!("/api/v1/tenants/{}", creation.tenant.id);

    let response_data = TenantCreationResponseDto {
        tenant: creation.tenant.into(),
        payment_id: creation.payment.id,
        payment_status: creation.payment.payment_status,
        job_id: creation.job.id,
    };

    Ok((
        StatusCode::CREATED,
        [
            ("Location", location_header),
            ("X-Trace-Id", trace_id.clone()),
        ],
        Json(wrap(response_data, &trace_id)),
    ))
}

/// Get a tenant by ID
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Tenant identifier (subdomain)")
    ),
    responses(
        (status = 200, description = "Tenant retrieved successfully", body = TenantApiResponse<TenantResponseDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantApiResponse<TenantResponseDto>>, ApiError> {
    let trace_id = request_trace_id();

    let tenant = TenantRepository::new(state.db.clone())
        .find_by_id(&tenant_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "TENANT_NOT_FOUND", "Tenant not found")
                .with_details(serde_json::json!({ "tenant_id": tenant_id }))
        })?;

    Ok(Json(wrap(tenant.into(), &trace_id)))
}

/// Inspect a tenant's database provisioning state
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}/database-status",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Tenant identifier (subdomain)")
    ),
    responses(
        (status = 200, description = "Status retrieved successfully", body = TenantApiResponse<TenantDatabaseStatus>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn database_status(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantApiResponse<TenantDatabaseStatus>>, ApiError> {
    let trace_id = request_trace_id();

    let status = state.provisioning.database_status(&tenant_id).await?;

    Ok(Json(wrap(status, &trace_id)))
}

/// Create and migrate the tenant's database synchronously
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/setup-database",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Tenant identifier (subdomain)")
    ),
    responses(
        (status = 200, description = "Database provisioned", body = TenantApiResponse<SetupDatabaseResponseDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 500, description = "Provisioning failed", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn setup_database(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantApiResponse<SetupDatabaseResponseDto>>, ApiError> {
    let trace_id = request_trace_id();

    let report = state.provisioning.setup_tenant_database(&tenant_id).await?;

    let response_data = SetupDatabaseResponseDto {
        tenant_id,
        applied: report.applied,
        skipped: report.skipped,
    };

    Ok(Json(wrap(response_data, &trace_id)))
}

/// Issue a tenant access token for the acting subscriber
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/token",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Tenant identifier (subdomain)")
    ),
    responses(
        (status = 200, description = "Token issued", body = TenantApiResponse<TenantToken>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Subscriber does not own this tenant", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn issue_token(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    SubscriberExtension(subscriber): SubscriberExtension,
    Path(tenant_id): Path<String>,
) -> Result<Json<TenantApiResponse<TenantToken>>, ApiError> {
    let trace_id = request_trace_id();

    let tenant = TenantRepository::new(state.db.clone())
        .find_by_id(&tenant_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "TENANT_NOT_FOUND", "Tenant not found")
                .with_details(serde_json::json!({ "tenant_id": tenant_id }))
        })?;

    let token = state.tokens.issue_for_tenant(subscriber.0, &tenant)?;

    Ok(Json(wrap(token, &trace_id)))
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
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::repositories::{PricePlanRepository, SubscriberRepository};
    use migration::{Migrator, MigratorTrait};

    struct TestApp {
        state: AppState,
        app: axum::Router,
        // Holds the tenant database directory alive for the test's duration.
        _dir: tempfile::TempDir,
    }

    async fn setup_test_app() -> TestApp {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
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

        let db = Database::connect(&central_url)
            .await
            .expect("Failed to init test DB");
        Migrator::up(&db, None).await.expect("Migrations failed");

        let state = AppState::new(Arc::new(config), db);
        let app = crate::server::create_app(state.clone());

        TestApp {
            state,
            app,
            _dir: dir,
        }
    }

    async fn seed_subscriber_and_plan(
        state: &AppState,
        price_cents: i64,
    ) -> (uuid::Uuid, uuid::Uuid) {
        let subscriber = SubscriberRepository::new(state.db.clone())
            .create("owner@example.com", Some("Owner"))
            .await
            .unwrap();
        let plan = PricePlanRepository::new(state.db.clone())
            .create_with_features("Test Plan", "monthly", price_cents, &[("blog", true)])
            .await
            .unwrap();
        (subscriber.id, plan.id)
    }

    fn auth_headers(subscriber_id: uuid::Uuid) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", "Bearer test-token".to_string()),
            ("X-Subscriber-Id", subscriber_id.to_string()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    fn post_json(
        uri: &str,
        subscriber_id: uuid::Uuid,
        body: serde_json::Value,
    ) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        for (name, value) in auth_headers(subscriber_id) {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_create_tenant_success() {
        let test = setup_test_app().await;
        let (subscriber_id, plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let request = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": plan_id }),
        );

        let response = test.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let location = response.headers().get("Location").unwrap();
        assert_eq!(location.to_str().unwrap(), "/api/v1/tenants/acme");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let response_json: TenantApiResponse<TenantCreationResponseDto> =
            serde_json::from_slice(&body).unwrap();

        assert_eq!(response_json.data.tenant.id, "acme");
        assert_eq!(response_json.data.tenant.provisioning_status, "created");
        // Zero-amount plan completes immediately; provisioning is queued.
        assert_eq!(response_json.data.payment_status, "complete");
        assert!(!response_json.data.job_id.is_nil());
    }

    #[tokio::test]
    async fn test_create_tenant_invalid_subdomain() {
        let test = setup_test_app().await;
        let (subscriber_id, plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let request = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "Not A Subdomain!", "plan_id": plan_id }),
        );

        let response = test.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error_json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error_json["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_create_tenant_duplicate_subdomain_conflicts() {
        let test = setup_test_app().await;
        let (subscriber_id, plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let first = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": plan_id }),
        );
        let response = test.app.clone().oneshot(first).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let second = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": plan_id }),
        );
        let response = test.app.oneshot(second).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_tenant_unknown_plan_404() {
        let test = setup_test_app().await;
        let (subscriber_id, _plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let request = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": uuid::Uuid::new_v4() }),
        );

        let response = test.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_tenant_not_found() {
        let test = setup_test_app().await;
        let (subscriber_id, _plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let mut builder = Request::builder().method("GET").uri("/api/v1/tenants/ghost");
        for (name, value) in auth_headers(subscriber_id) {
            builder = builder.header(name, value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = test.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error_json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error_json["code"], "TENANT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_setup_database_and_status() {
        let test = setup_test_app().await;
        let (subscriber_id, plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let create = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": plan_id }),
        );
        let response = test.app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Database does not exist until setup runs.
        assert!(!test.state.provisioning.database_exists("acme").await);

        let setup = post_json("/api/v1/tenants/acme/setup-database", subscriber_id, json!({}));
        let response = test.app.clone().oneshot(setup).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let response_json: TenantApiResponse<SetupDatabaseResponseDto> =
            serde_json::from_slice(&body).unwrap();
        // Plan carries the blog feature, so Blog lands next to Core.
        assert_eq!(response_json.data.applied, vec!["Blog", "Core"]);
        assert!(response_json.data.skipped.is_empty());

        let mut builder = Request::builder()
            .method("GET")
            .uri("/api/v1/tenants/acme/database-status");
        for (name, value) in auth_headers(subscriber_id) {
            builder = builder.header(name, value);
        }
        let response = test
            .app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status_json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(status_json["data"]["provisioning_status"], "ready");
        assert_eq!(status_json["data"]["database_exists"], true);
    }

    #[tokio::test]
    async fn test_issue_token_requires_ownership() {
        let test = setup_test_app().await;
        let (subscriber_id, plan_id) = seed_subscriber_and_plan(&test.state, 0).await;

        let create = post_json(
            "/api/v1/tenants",
            subscriber_id,
            json!({ "subdomain": "acme", "plan_id": plan_id }),
        );
        let response = test.app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The owner gets a token.
        let request = post_json("/api/v1/tenants/acme/token", subscriber_id, json!({}));
        let response = test.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let token_json: TenantApiResponse<TenantToken> = serde_json::from_slice(&body).unwrap();
        let claims = test.state.tokens.verify(&token_json.data.token).unwrap();
        assert_eq!(claims.tenant, "acme");
        assert_eq!(claims.sub, subscriber_id.to_string());

        // A different subscriber is refused.
        let stranger = SubscriberRepository::new(test.state.db.clone())
            .create("stranger@example.com", None)
            .await
            .unwrap();
        let request = post_json("/api/v1/tenants/acme/token", stranger.id, json!({}));
        let response = test.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
