use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser, TokenPair},
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, message_response, success_response, MessageBody},
    services::accounts::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RegistrationResponse, UserPayload,
        VendorRegistration,
    },
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthCheck {
    pub authenticated: bool,
    pub user: UserPayload,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CsrfToken {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

/// Sign in with username and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Vendor account not approved", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.services.accounts.login(payload).await?;
    Ok(success_response(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .auth
        .refresh_token(&payload.refresh_token)
        .await
        .map_err(ServiceError::from)?;
    Ok(success_response(tokens))
}

/// Issue an anti-forgery token for browser clients
#[utoipa::path(
    get,
    path = "/api/v1/auth/csrf",
    responses((status = 200, description = "Token issued", body = CsrfToken)),
    tag = "auth"
)]
pub async fn csrf() -> impl IntoResponse {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    success_response(CsrfToken {
        csrf_token: hex::encode(bytes),
    })
}

/// Revoke the presented access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Signed out", body = MessageBody)),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> impl IntoResponse {
    state.services.accounts.logout(&user).await;
    message_response("Logout successful")
}

/// Report whether the caller is signed in
#[utoipa::path(
    get,
    path = "/api/v1/auth/check",
    responses(
        (status = 200, description = "Signed in", body = AuthCheck),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.services.accounts.current_user(user.user_id).await?;
    Ok(success_response(AuthCheck {
        authenticated: true,
        user: payload,
    }))
}

/// Account of the caller
#[utoipa::path(
    get,
    path = "/api/v1/auth/current-user",
    responses(
        (status = 200, description = "Current user", body = UserPayload),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.services.accounts.current_user(user.user_id).await?;
    Ok(success_response(payload))
}

/// Public vendor self-registration
#[utoipa::path(
    post,
    path = "/api/v1/vendor/register",
    request_body = VendorRegistration,
    responses(
        (status = 201, description = "Registration received", body = RegistrationResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_vendor(
    State(state): State<AppState>,
    Json(payload): Json<VendorRegistration>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.services.accounts.register_vendor(payload).await?;
    Ok(created_response(response))
}

/// Change the caller's own password
#[utoipa::path(
    post,
    path = "/api/v1/employees/{id}/change-password",
    request_body = ChangePasswordRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Password changed", body = MessageBody),
        (status = 400, description = "Invalid password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the caller's account", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .accounts
        .change_password(&user, id, payload)
        .await?;
    Ok(message_response("Password changed successfully"))
}

pub fn auth_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/csrf", get(csrf))
        .route("/vendor/register", post(register_vendor));

    let authenticated = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/check", get(check))
        .route("/auth/current-user", get(current_user))
        .route("/employees/:id/change-password", post(change_password))
        .with_auth();

    public.merge(authenticated)
}
