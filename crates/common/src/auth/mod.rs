//! Session decoding and role checks
//!
//! Provides:
//! - JWT session token generation and validation
//! - `SessionContext` extraction that fails closed
//! - Role gates used by every service entry point

use crate::db::models::Role;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

/// Roles allowed to run shelter operations
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Staff];

/// Roles allowed to manage catalogs and templates
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Every signed-in role
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::Staff, Role::User];

/// Identity of the caller, passed explicitly into every service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub person_id: Uuid,
    pub role: Role,
    pub image: Option<String>,
}

impl SessionContext {
    pub fn new(person_id: Uuid, role: Role) -> Self {
        Self { person_id, role, image: None }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Whether the session holds one of `allowed`. No session means no.
pub fn roles_with_permission(session: Option<&SessionContext>, allowed: &[Role]) -> bool {
    session.is_some_and(|s| allowed.contains(&s.role))
}

/// Gate a call on role membership.
///
/// Missing session is `Unauthorized`, a role outside `allowed` is `Forbidden`.
pub fn require_roles<'a>(session: Option<&'a SessionContext>, allowed: &[Role]) -> Result<&'a SessionContext> {
    match session {
        None => Err(AppError::Unauthorized {
            message: crate::errors::ACCESS_DENIED.to_string(),
        }),
        Some(s) if allowed.contains(&s.role) => Ok(s),
        Some(_) => Err(AppError::access_denied()),
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (person ID)
    pub sub: String,

    pub role: Role,

    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

/// Longest token lifetime issued, whatever the configuration asks for
const MAX_LIFETIME_SECS: u64 = 366 * 24 * 60 * 60;

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::try_seconds(expiration_secs.min(MAX_LIFETIME_SECS) as i64)
                .unwrap_or_else(Duration::zero),
        }
    }

    /// Issue a token for a session. Login lives elsewhere; this serves
    /// tooling and tests.
    pub fn generate_token(&self, session: &SessionContext) -> Result<String> {
        let now = Utc::now();
        let exp = now.checked_add_signed(self.lifetime).ok_or_else(|| AppError::Internal {
            message: "Token expiry out of range".to_string(),
        })?;

        let claims = SessionClaims {
            sub: session.person_id.to_string(),
            role: session.role,
            image: session.image.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: format!("Invalid session token: {}", e),
                },
            })
    }

    /// Decode a token into a session
    pub fn session(&self, token: &str) -> Result<SessionContext> {
        let claims = self.validate_token(token)?;
        let person_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized {
            message: "Invalid session subject".to_string(),
        })?;
        Ok(SessionContext {
            person_id,
            role: claims.role,
            image: claims.image,
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

fn session_from_parts(parts: &Parts, jwt: &JwtManager) -> Option<SessionContext> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)?;

    match jwt.session(token) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            None
        }
    }
}

/// Axum extractor for a required session
impl<S> FromRequestParts<S> for SessionContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        session_from_parts(parts, &jwt).ok_or_else(|| AppError::Unauthorized {
            message: crate::errors::ACCESS_DENIED.to_string(),
        })
    }
}

/// Axum extractor for an optional session; any decode failure is `None`
impl<S> OptionalFromRequestParts<S> for SessionContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Option<Self>, Infallible> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        Ok(session_from_parts(parts, &jwt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Clone)]
    struct TestState {
        jwt: Arc<JwtManager>,
    }

    impl FromRef<TestState> for Arc<JwtManager> {
        fn from_ref(state: &TestState) -> Self {
            state.jwt.clone()
        }
    }

    fn state() -> TestState {
        TestState { jwt: Arc::new(JwtManager::new("test_secret", 3600)) }
    }

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/v1/tasks");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_roles_with_permission_fails_closed() {
        let staff = SessionContext::new(Uuid::new_v4(), Role::Staff);
        let user = SessionContext::new(Uuid::new_v4(), Role::User);

        assert!(!roles_with_permission(None, STAFF_ROLES));
        assert!(!roles_with_permission(Some(&user), STAFF_ROLES));
        assert!(roles_with_permission(Some(&staff), STAFF_ROLES));
        assert!(!roles_with_permission(Some(&staff), ADMIN_ROLES));
        assert!(!roles_with_permission(Some(&staff), &[]));
    }

    #[test]
    fn test_require_roles_distinguishes_missing_from_wrong() {
        let user = SessionContext::new(Uuid::new_v4(), Role::User);

        assert!(matches!(require_roles(None, STAFF_ROLES), Err(AppError::Unauthorized { .. })));
        assert!(matches!(require_roles(Some(&user), STAFF_ROLES), Err(AppError::Forbidden { .. })));
        assert!(require_roles(Some(&user), ANY_ROLE).is_ok());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let mut session = SessionContext::new(Uuid::new_v4(), Role::Admin);
        session.image = Some("/uploads/avatar.png".into());

        let token = manager.generate_token(&session).unwrap();
        assert_eq!(manager.session(&token).unwrap(), session);
    }

    #[test]
    fn test_huge_lifetime_is_capped() {
        let manager = JwtManager::new("test_secret", u64::MAX);
        let session = SessionContext::new(Uuid::new_v4(), Role::User);
        let token = manager.generate_token(&session).unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_LIFETIME_SECS as i64);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtManager::new("one", 3600)
            .generate_token(&SessionContext::new(Uuid::new_v4(), Role::Staff))
            .unwrap();
        assert!(JwtManager::new("two", 3600).session(&token).is_err());
    }

    #[tokio::test]
    async fn test_extractor_decodes_valid_token() {
        let state = state();
        let session = SessionContext::new(Uuid::new_v4(), Role::Staff);
        let token = state.jwt.generate_token(&session).unwrap();

        let mut parts = parts_with(Some(format!("Bearer {}", token)));
        let extracted = <SessionContext as FromRequestParts<_>>::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(extracted, session);
    }

    #[tokio::test]
    async fn test_extractor_fails_closed() {
        let state = state();

        let mut missing = parts_with(None);
        let result = <SessionContext as FromRequestParts<_>>::from_request_parts(&mut missing, &state).await;
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));

        let mut garbage = parts_with(Some("Bearer not-a-token".into()));
        let optional =
            <SessionContext as OptionalFromRequestParts<_>>::from_request_parts(&mut garbage, &state)
                .await
                .unwrap();
        assert!(optional.is_none());
    }

    #[tokio::test]
    async fn test_unknown_role_claim_means_no_session() {
        let state = state();
        let claims = serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "role": "SUPERUSER",
            "exp": Utc::now().timestamp() + 600,
            "iat": Utc::now().timestamp(),
        });
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test_secret")).unwrap();

        let mut parts = parts_with(Some(format!("Bearer {}", token)));
        let optional = <SessionContext as OptionalFromRequestParts<_>>::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(optional.is_none());
    }
}
