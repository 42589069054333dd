//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Landlord API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::handlers;
use crate::provisioning::ProvisioningService;
use crate::telemetry::{TraceContext, with_trace_context};
use crate::tokens::TokenIssuer;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub provisioning: Arc<ProvisioningService>,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        let provisioning = Arc::new(ProvisioningService::new(db.clone(), Arc::clone(&config)));
        let tokens = TokenIssuer::from_config(&config);
        Self {
            db,
            config,
            provisioning,
            tokens,
        }
    }
}

/// Assign every request a trace context and echo it back as X-Trace-Id.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let context = TraceContext {
        trace_id: trace_id.clone(),
    };
    request.extensions_mut().insert(context.clone());

    let mut response = with_trace_context(context, next.run(request)).await;

    if let Ok(value) = trace_id.parse() {
        response.headers_mut().insert("X-Trace-Id", value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/tenants", post(handlers::tenants::create_tenant))
        .route("/api/v1/tenants/{id}", get(handlers::tenants::get_tenant))
        .route(
            "/api/v1/tenants/{id}/database-status",
            get(handlers::tenants::database_status),
        )
        .route(
            "/api/v1/tenants/{id}/setup-database",
            post(handlers::tenants::setup_database),
        )
        .route(
            "/api/v1/tenants/{id}/token",
            post(handlers::tenants::issue_token),
        )
        .route(
            "/api/v1/payments/{id}/complete",
            post(handlers::payments::complete_payment),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .merge(protected)
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::clone(&state.config);
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::database_status,
        crate::handlers::tenants::setup_database,
        crate::handlers::tenants::issue_token,
        crate::handlers::payments::complete_payment,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::tenants::CreateTenantRequestDto,
            crate::handlers::tenants::TenantResponseDto,
            crate::handlers::tenants::TenantCreationResponseDto,
            crate::handlers::tenants::SetupDatabaseResponseDto,
            crate::handlers::payments::PaymentCompletionResponseDto,
            crate::provisioning::TenantDatabaseStatus,
            crate::provisioning::ProvisioningStatus,
            crate::tokens::TenantToken,
        )
    ),
    info(
        title = "Landlord API",
        description = "API for tenant lifecycle and subscription provisioning",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
