use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{created_response, no_content_response, success_response},
    models::vendor,
    services::vendors::{
        CreateVendor, CreatedVendor, UpdateVendor, VendorAccount, VendorDecision, VendorFilter,
    },
    AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectVendorRequest {
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VendorAccountRequest {
    pub username: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    params(VendorFilter),
    responses((status = 200, description = "Vendors", body = [vendor::Model])),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    Query(filter): Query<VendorFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.vendors.list(filter).await?))
}

/// Create a vendor, optionally with a portal login
#[utoipa::path(
    post,
    path = "/api/v1/vendors",
    request_body = CreateVendor,
    responses(
        (status = 201, description = "Vendor created", body = CreatedVendor),
        (status = 400, description = "Invalid or duplicate fields", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    Json(payload): Json<CreateVendor>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.vendors.create(payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor", body = vendor::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.vendors.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/vendors/{id}",
    request_body = UpdateVendor,
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses((status = 200, description = "Vendor updated", body = vendor::Model)),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVendor>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.vendors.update(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vendors/{id}",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 204, description = "Vendor deleted"),
        (status = 400, description = "Vendor has RFQs, orders or invoices", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.vendors.delete(id).await?;
    Ok(no_content_response())
}

/// Approve a vendor and assign its permanent code
#[utoipa::path(
    post,
    path = "/api/v1/vendors/{id}/approve",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor approved", body = VendorDecision),
        (status = 400, description = "Already approved", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn approve_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.vendors.approve(id, user.user_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendors/{id}/reject",
    request_body = RejectVendorRequest,
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor rejected", body = VendorDecision),
        (status = 400, description = "Rejection reason is required", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn reject_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectVendorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    Ok(success_response(
        state
            .services
            .vendors
            .reject(id, user.user_id, payload.rejection_reason)
            .await?,
    ))
}

/// Create a portal login for a vendor that has none
#[utoipa::path(
    post,
    path = "/api/v1/vendors/{id}/create_user_account",
    request_body = VendorAccountRequest,
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 201, description = "Account created", body = VendorAccount),
        (status = 400, description = "Vendor already has a user account", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn create_vendor_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<VendorAccountRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    Ok(created_response(
        state
            .services
            .vendors
            .create_user_account(id, payload.username)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendors/{id}/reset_vendor_password",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Password reset", body = VendorAccount),
        (status = 404, description = "No user account found for this vendor", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors",
    security(("bearer_auth" = []))
)]
pub async fn reset_vendor_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.vendors.reset_password(id).await?))
}

pub fn vendor_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/vendors", get(list_vendors))
        .route("/vendors/:id", get(get_vendor))
        .with_permission(perm::VENDORS_READ);

    let manage = Router::new()
        .route("/vendors", post(create_vendor))
        .route(
            "/vendors/:id",
            axum::routing::put(update_vendor)
                .patch(update_vendor)
                .delete(delete_vendor),
        )
        .route("/vendors/:id/approve", post(approve_vendor))
        .route("/vendors/:id/reject", post(reject_vendor))
        .route("/vendors/:id/create_user_account", post(create_vendor_account))
        .route("/vendors/:id/reset_vendor_password", post(reset_vendor_password))
        .with_permission(perm::VENDORS_MANAGE);

    read.merge(manage)
}
