//! Tenant access tokens.
//!
//! Short-lived HS256 JWTs that let a subscriber act against one of their own
//! tenants. Issuance is gated on ownership; verification checks signature and
//! expiry.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::tenant;

/// Claims carried in a tenant access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantClaims {
    /// Subscriber id the token was issued to
    pub sub: String,
    /// Tenant the token grants access to
    pub tenant: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// An issued tenant access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantToken {
    /// Encoded JWT
    pub token: String,
    /// Expiry timestamp of the token
    pub expires_at: DateTime<FixedOffset>,
}

/// Errors that can occur while issuing or verifying tenant tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("subscriber does not own this tenant")]
    NotOwner,
    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::NotOwner => forbidden(Some("Subscriber does not own this tenant")),
            TokenError::Jwt(_) => unauthorized(Some("Invalid or expired tenant token")),
        }
    }
}

/// Issues and verifies tenant access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new<S: Into<String>>(secret: S, ttl_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret(), config.tenant_token_ttl_seconds)
    }

    /// Issue a token for a subscriber against a tenant they own.
    pub fn issue_for_tenant(
        &self,
        subscriber_id: Uuid,
        tenant: &tenant::Model,
    ) -> Result<TenantToken, TokenError> {
        if tenant.subscriber_id != subscriber_id {
            return Err(TokenError::NotOwner);
        }

        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_seconds as i64);

        let claims = TenantClaims {
            sub: subscriber_id.to_string(),
            tenant: tenant.id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(TenantToken {
            token,
            expires_at: expires_at.fixed_offset(),
        })
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<TenantClaims, TokenError> {
        let data = decode::<TenantClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenant_owned_by(subscriber_id: Uuid) -> tenant::Model {
        let now = Utc::now().fixed_offset();
        tenant::Model {
            id: "acme".to_string(),
            subscriber_id,
            theme: None,
            data: None,
            provisioning_status: "ready".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let issuer = TokenIssuer::new("test-secret", 3600);
        let subscriber_id = Uuid::new_v4();
        let tenant = tenant_owned_by(subscriber_id);

        let issued = issuer.issue_for_tenant(subscriber_id, &tenant).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, subscriber_id.to_string());
        assert_eq!(claims.tenant, "acme");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_issue_rejects_non_owner() {
        let issuer = TokenIssuer::new("test-secret", 3600);
        let tenant = tenant_owned_by(Uuid::new_v4());

        let result = issuer.issue_for_tenant(Uuid::new_v4(), &tenant);
        assert!(matches!(result, Err(TokenError::NotOwner)));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let issuer = TokenIssuer::new("test-secret", 3600);
        let subscriber_id = Uuid::new_v4();
        let tenant = tenant_owned_by(subscriber_id);
        let issued = issuer.issue_for_tenant(subscriber_id, &tenant).unwrap();

        let other = TokenIssuer::new("other-secret", 3600);
        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let secret = "test-secret";
        let now = Utc::now().timestamp();
        let claims = TenantClaims {
            sub: Uuid::new_v4().to_string(),
            tenant: "acme".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let issuer = TokenIssuer::new(secret, 3600);
        assert!(issuer.verify(&token).is_err());
    }
}
