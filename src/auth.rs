//! JWT verification and the caller-identity extractor.
//!
//! Identity is provider-issued; this module only verifies the HS256
//! signature and hands the caller to handlers as an explicit value. There is
//! no ambient current-user state anywhere in the services.

use async_trait::async_trait;
use axum::{
    extract::FromRef,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::AppState;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role assigned by the identity provider
    #[serde(default)]
    pub role: Option<String>,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// The verified caller, passed explicitly into every service call.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub role: Option<String>,
}

/// Validates a bearer token and extracts the claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ServiceError::Unauthorized("token expired".into())
        }
        _ => ServiceError::Unauthorized("invalid token".into()),
    })
}

/// Issues a signed token; used by the test harness and tooling.
pub fn issue_token(
    user_id: &str,
    role: Option<&str>,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.map(|r| r.to_string()),
        iat: now,
        exp: now + expires_in_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("token creation failed: {}", e)))
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for CallerIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing authorization header".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("expected bearer token".into()))?;

        let claims = validate_token(token, &app_state.config.jwt_secret)?;
        Ok(CallerIdentity {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_that_is_long_enough_for_hs256_use";

    #[test]
    fn issued_token_round_trips() {
        let token = issue_token("user-1", Some("cashier"), SECRET, 3600).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role.as_deref(), Some("cashier"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("user-1", None, SECRET, -3600).unwrap();
        let err = validate_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("user-1", None, SECRET, 3600).unwrap();
        let err = validate_token(&token, "another_secret_that_is_also_long_enough!!").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
