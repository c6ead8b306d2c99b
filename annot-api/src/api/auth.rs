//! Bearer-token authentication
//!
//! Tokens are HS256 JWTs issued by this service (`annot-api issue-token`).
//! Without a configured secret the service runs in development mode and
//! trusts the `X-User-Id` header instead. Either way the user must exist.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use annot_common::config::AuthSettings;
use annot_common::models::{User, UserRole};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Development-mode header naming the acting user
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Token settings held in application state
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            jwt_secret: settings.jwt_secret.clone().filter(|s| !s.is_empty()),
            token_ttl_secs: settings.token_ttl_secs,
        }
    }
}

impl AuthConfig {
    /// Development mode: no secret, acting user taken from `X-User-Id`
    pub fn development() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 86_400,
        }
    }

    pub fn with_secret(secret: impl Into<String>, token_ttl_secs: i64) -> Self {
        Self {
            jwt_secret: Some(secret.into()),
            token_ttl_secs,
        }
    }

    pub fn is_development(&self) -> bool {
        self.jwt_secret.is_none()
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated user, placed in request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Issue a token for `user`
pub fn issue_token(config: &AuthConfig, user: &User) -> ApiResult<String> {
    let secret = config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("No jwt_secret configured; tokens are disabled".to_string()))?;

    let iat = annot_common::time::now_epoch_secs();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat,
        exp: iat + config.token_ttl_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify signature and expiry
pub fn verify_token(secret: &str, token: &str) -> ApiResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired".to_string()),
            ErrorKind::InvalidSignature => ApiError::Unauthorized("Invalid token signature".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", e)),
        })
}

fn header_value<'a>(request: &'a Request, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

fn acting_user_id(config: &AuthConfig, request: &Request) -> ApiResult<Uuid> {
    let raw = match &config.jwt_secret {
        Some(secret) => {
            let header = header_value(request, AUTHORIZATION)
                .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
            let token = header
                .strip_prefix("Bearer ")
                .ok_or_else(|| ApiError::Unauthorized("Authorization must be a bearer token".to_string()))?;
            verify_token(secret, token.trim())?.sub
        }
        None => header_value(request, DEV_USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?
            .to_string(),
    };

    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Unauthorized("Malformed user id".to_string()))
}

/// Authentication middleware
///
/// Applied to every `/api` route; `/health` stays public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let user_id = acting_user_id(&state.auth, &request).map_err(|e| {
        warn!(path = %request.uri().path(), "Rejected request: {}", e);
        e
    })?;

    let user = db::users::find_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(format!("Unknown user {}", user_id)))?;

    debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annot_common::time::now;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            google_id: None,
            avatar: None,
            role: UserRole::Reviewer,
            column_preferences: serde_json::json!({}),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let config = AuthConfig::with_secret("test-secret", 60);
        let user = user();

        let token = issue_token(&config, &user).unwrap();
        let claims = verify_token("test-secret", &token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "ada@example.org");
        assert_eq!(claims.role, UserRole::Reviewer);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&AuthConfig::with_secret("one", 60), &user()).unwrap();
        assert!(matches!(verify_token("two", &token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway
        let token = issue_token(&AuthConfig::with_secret("s", -600), &user()).unwrap();
        assert!(matches!(verify_token("s", &token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_no_tokens_in_development_mode() {
        assert!(issue_token(&AuthConfig::development(), &user()).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", AuthConfig::with_secret("hunter2", 60));
        assert!(!rendered.contains("hunter2"));
    }
}
