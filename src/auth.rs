//! # Authentication and Authorization
//!
//! This module provides operator bearer authentication and subscriber header
//! validation for protected API endpoints.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized, unauthorized_with_trace_id, validation_error};
use crate::server::AppState;
use crate::telemetry::TraceContext;

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Subscriber ID wrapper for type safety
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriberId(pub Uuid);

/// Marker type for authenticated operator requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorAuth;

/// Extractor for subscriber ID from request extensions
#[derive(Debug, Clone)]
pub struct SubscriberExtension(pub SubscriberId);

/// Authentication middleware that validates bearer tokens and the acting
/// subscriber header
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();

    // Extract trace_id from request context for consistent error responses
    let trace_id = request
        .extensions()
        .get::<TraceContext>()
        .map(|ctx| ctx.trace_id.clone());

    let token = extract_bearer_token_with_trace_id(&headers, trace_id)?;
    validate_token(&config, token)?;

    let subscriber = extract_subscriber_id(&headers)?;
    tracing::info!(subscriber_id = %subscriber.0, "Authenticated operator request");

    let mut request = request;
    request
        .extensions_mut()
        .insert(SubscriberExtension(subscriber));
    request.extensions_mut().insert(OperatorAuth);

    Ok(next.run(request).await)
}

fn extract_bearer_token_with_trace_id(
    headers: &HeaderMap,
    trace_id: Option<String>,
) -> Result<&str, ApiError> {
    let with_trace = |message: &str, trace_id: Option<String>| {
        if let Some(trace_id) = trace_id {
            unauthorized_with_trace_id(Some(message), trace_id)
        } else {
            unauthorized(Some(message))
        }
    };

    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| with_trace("Missing Authorization header", trace_id.clone()))?;

    let header = value
        .to_str()
        .map_err(|_| with_trace("Invalid Authorization header", trace_id.clone()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| with_trace("Authorization header must use Bearer scheme", trace_id))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

fn extract_subscriber_id(headers: &HeaderMap) -> Result<SubscriberId, ApiError> {
    let header_value = headers
        .get("X-Subscriber-Id")
        .ok_or_else(|| {
            validation_error(
                "Missing required header",
                serde_json::json!({ "X-Subscriber-Id": "Required header is missing" }),
            )
        })?
        .to_str()
        .map_err(|_| {
            validation_error(
                "Invalid subscriber header",
                serde_json::json!({ "X-Subscriber-Id": "Header must be valid UTF-8" }),
            )
        })?;

    header_value
        .parse::<Uuid>()
        .map(SubscriberId)
        .map_err(|_| {
            validation_error(
                "Invalid subscriber ID",
                serde_json::json!({ "X-Subscriber-Id": "Must be a valid UUID" }),
            )
        })
}

/// OpenAPI header parameter for X-Subscriber-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct SubscriberHeader {
    /// Subscriber identifier (UUID) the request acts on behalf of
    #[serde(rename = "X-Subscriber-Id")]
    #[param(rename = "X-Subscriber-Id", value_type = String)]
    pub subscriber_id: String,
}

impl<S> FromRequestParts<S> for SubscriberExtension
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SubscriberExtension>()
            .cloned()
            .ok_or_else(|| {
                validation_error(
                    "Subscriber context missing",
                    serde_json::json!({ "X-Subscriber-Id": "Subscriber context not present" }),
                )
            })
    }
}

impl<S> FromRequestParts<S> for OperatorAuth
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Operator authentication required")))
    }
}
