/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token authentication for the procurement API:
 *
 * - JWT access and refresh tokens signed with HS256
 * - Argon2 password hashing (`password`)
 * - Role to permission mapping (`rbac`, `permissions`)
 * - Route guards that attach the authenticated user to the request
 *
 * Logging out revokes the token id in an in-memory blacklist that is pruned
 * as entries expire.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{user, user_profile, vendor, UserRole, VendorStatus};

pub mod password;
pub mod permissions;
pub mod rbac;

pub use password::{
    generate_temporary_password, hash_password, verify_password, MIN_PASSWORD_LENGTH,
};
pub use permissions::*;
pub use rbac::*;

const ACCESS_TOKEN: &str = "access";
const REFRESH_TOKEN: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub vendor_id: Option<String>,
    pub token_type: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub permissions: Vec<String>,
    /// Vendor record linked to a vendor account.
    pub vendor_id: Option<Uuid>,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    /// Check if the user holds a permission, directly or through a wildcard
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| permission_implies(granted, permission))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    pub fn is_vendor(&self) -> bool {
        self.has_role(UserRole::Vendor)
    }

    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = UserRole::from_str(&claims.role).map_err(|_| AuthError::InvalidToken)?;
        let vendor_id = match claims.vendor_id {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| AuthError::InvalidToken)?),
            None => None,
        };

        Ok(Self {
            user_id,
            username: claims.username,
            email: claims.email,
            role,
            permissions: claims.permissions,
            vendor_id,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

/// Everything needed to mint tokens for an account.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub vendor_id: Option<Uuid>,
    pub is_active: bool,
}

impl AuthIdentity {
    /// Superusers are administrators regardless of profile; everyone else
    /// takes the role recorded on their profile.
    pub fn from_records(user: &user::Model, profile: Option<&user_profile::Model>) -> Self {
        let role = if user.is_superuser {
            UserRole::Admin
        } else {
            profile.map(|p| p.role).unwrap_or(UserRole::Employee)
        };

        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role,
            vendor_id: profile.and_then(|p| p.vendor_id),
            is_active: user.is_active,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }

    pub fn from_app_config(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        )
    }
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Issue an access/refresh token pair for an account
    pub fn generate_token(&self, identity: &AuthIdentity) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_claims = self.claims(identity, ACCESS_TOKEN, now, access_exp);
        let mut refresh_claims = self.claims(identity, REFRESH_TOKEN, now, refresh_exp);
        refresh_claims.permissions.clear();

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    fn claims(
        &self,
        identity: &AuthIdentity,
        token_type: &str,
        issued: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> Claims {
        Claims {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            email: Some(identity.email.clone()),
            role: identity.role.to_string(),
            permissions: permissions_for_role(identity.role),
            vendor_id: identity.vendor_id.map(|v| v.to_string()),
            token_type: token_type.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued.timestamp(),
            exp: expires.timestamp(),
            nbf: issued.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Validate an access token and build the request user from it
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token).await?;
        if claims.token_type != ACCESS_TOKEN {
            return Err(AuthError::InvalidToken);
        }
        AuthUser::from_claims(claims)
    }

    /// Re-reads the account behind a token. Deactivated users and vendors
    /// that are no longer approved lose access before their tokens expire.
    pub async fn ensure_account_usable(&self, user: &AuthUser) -> Result<(), AuthError> {
        let account = user::Entity::find_by_id(user.user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !account.is_active {
            return Err(AuthError::AccountInactive);
        }

        if let Some(vendor_id) = user.vendor_id {
            let status = vendor::Entity::find_by_id(vendor_id)
                .one(self.db.as_ref())
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?
                .map(|v| v.status);
            if matches!(status, Some(s) if s != VendorStatus::Approved) {
                debug!(user_id = %user.user_id, %vendor_id, "vendor no longer approved");
                return Err(AuthError::AccountInactive);
            }
        }
        Ok(())
    }

    /// Exchange a refresh token for a fresh pair. The old refresh token is
    /// revoked and the account is re-read so role changes take effect.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        if claims.token_type != REFRESH_TOKEN {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let identity = self.load_identity(user_id).await?;
        if !identity.is_active {
            return Err(AuthError::AccountInactive);
        }

        self.blacklist(claims.jti, claims.exp).await;
        self.generate_token(&identity)
    }

    /// Load the account and profile backing a token subject
    pub async fn load_identity(&self, user_id: Uuid) -> Result<AuthIdentity, AuthError> {
        let user = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        let profile = user_profile::Entity::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(AuthIdentity::from_records(&user, profile.as_ref()))
    }

    /// Revoke the token the user authenticated with
    pub async fn revoke_token(&self, user: &AuthUser) {
        self.blacklist(user.token_id.clone(), user.expires_at).await;
        debug!(user_id = %user.user_id, "token revoked");
    }

    async fn blacklist(&self, jti: String, exp: i64) {
        let expiry = Utc
            .timestamp_opt(exp, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken { jti, expiry });

        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }
}

/// Token pair response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication credentials were not provided",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired",
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked",
            ),
            Self::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "AUTH_USER_NOT_FOUND",
                "User not found",
            ),
            Self::AccountInactive => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_INACTIVE",
                "Account is inactive",
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Could not issue token",
            ),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error",
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "authentication failed");
        }
        let body = crate::errors::error_body(
            status,
            message.to_string(),
            Some(serde_json::json!({ "code": code })),
        );
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        let (status, _, message) = err.parts();
        match status {
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message.to_string()),
            StatusCode::FORBIDDEN => ServiceError::Forbidden(message.to_string()),
            _ => ServiceError::InternalError(err.to_string()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    // Admins have all permissions
    if user.is_admin() {
        return Ok(next.run(request).await);
    }

    if !user.has_permission(&required_permission) {
        warn!(
            user_id = %user.user_id,
            permission = %required_permission,
            "permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract the bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
    let user = auth_service.authenticate(token).await?;
    auth_service.ensure_account_usable(&user).await?;
    Ok(user)
}

/// Type alias used by handlers
pub type AuthenticatedUser = AuthUser;

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    async fn service() -> AuthService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        AuthService::new(
            AuthConfig::new(
                "x".repeat(64),
                "procurement-api".into(),
                "procurement-auth".into(),
                Duration::from_secs(600),
                Duration::from_secs(3600),
            ),
            Arc::new(db),
        )
    }

    fn identity(role: UserRole) -> AuthIdentity {
        AuthIdentity {
            user_id: Uuid::new_v4(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            role,
            vendor_id: (role == UserRole::Vendor).then(Uuid::new_v4),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn access_token_round_trips_into_auth_user() {
        let auth = service().await;
        let id = identity(UserRole::Vendor);
        let pair = auth.generate_token(&id).unwrap();

        let user = auth.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(user.user_id, id.user_id);
        assert_eq!(user.role, UserRole::Vendor);
        assert_eq!(user.vendor_id, id.vendor_id);
        assert!(user.has_permission(consts::VENDOR_PORTAL_ACCESS));
        assert!(!user.has_permission(consts::PURCHASE_ORDERS_READ));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let auth = service().await;
        let pair = auth.generate_token(&identity(UserRole::Employee)).unwrap();
        assert!(matches!(
            auth.authenticate(&pair.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected() {
        let auth = service().await;
        let pair = auth.generate_token(&identity(UserRole::Admin)).unwrap();
        let user = auth.authenticate(&pair.access_token).await.unwrap();

        auth.revoke_token(&user).await;
        assert!(matches!(
            auth.authenticate(&pair.access_token).await,
            Err(AuthError::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_fail() {
        let auth = service().await;
        let mut other = service().await;
        other.config.jwt_secret = "y".repeat(64);
        let pair = other.generate_token(&identity(UserRole::Admin)).unwrap();
        assert!(matches!(
            auth.authenticate(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn superusers_are_admins_without_a_profile() {
        let now = Utc::now();
        let user = user::Model {
            id: Uuid::new_v4(),
            username: "root".into(),
            email: "root@example.com".into(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: true,
            is_superuser: true,
            last_login: None,
            created_at: now,
        };
        assert_eq!(AuthIdentity::from_records(&user, None).role, UserRole::Admin);
    }
}
