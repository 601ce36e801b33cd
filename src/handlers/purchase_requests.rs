use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{created_response, no_content_response, success_response},
    models::purchase_request,
    services::requisitions::{
        CreatePurchaseRequest, PurchaseRequestDecision, PurchaseRequestFilter,
        RejectPurchaseRequest, RfqDispatch, SendRfqRequest, UpdatePurchaseRequest,
    },
    AppState,
};

/// Purchase requests visible to the caller, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests",
    params(PurchaseRequestFilter),
    responses((status = 200, description = "Purchase requests", body = [purchase_request::Model])),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<PurchaseRequestFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.requisitions.list(&user, filter).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/my_requests",
    responses((status = 200, description = "Caller's purchase requests", body = [purchase_request::Model])),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.requisitions.my_requests(&user).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase request created", body = purchase_request::Model),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.requisitions.create(&user, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Purchase request", body = purchase_request::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.requisitions.get(&user, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-requests/{id}",
    request_body = UpdatePurchaseRequest,
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses((status = 200, description = "Purchase request updated", body = purchase_request::Model)),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn update_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.requisitions.update(&user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-requests/{id}",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses((status = 204, description = "Purchase request deleted")),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn delete_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.requisitions.delete(&user, id).await?;
    Ok(no_content_response())
}

/// Approve a pending purchase request
#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/approve",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Approved", body = PurchaseRequestDecision),
        (status = 400, description = "Only pending requests can be approved", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn approve_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.requisitions.approve(id, user.user_id).await?,
    ))
}

/// Reject a pending purchase request
#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/reject",
    request_body = RejectPurchaseRequest,
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Rejected", body = PurchaseRequestDecision),
        (status = 400, description = "Only pending requests can be rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectPurchaseRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    Ok(success_response(
        state
            .services
            .requisitions
            .reject(id, user.user_id, payload)
            .await?,
    ))
}

/// Send RFQs for an approved purchase request to the selected vendors
#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/send-rfq",
    request_body = SendRfqRequest,
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 201, description = "RFQs sent", body = RfqDispatch),
        (status = 400, description = "Request not approved or no vendors", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-requests",
    security(("bearer_auth" = []))
)]
pub async fn send_rfq(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendRfqRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .requisitions
            .send_rfq(id, user.user_id, payload)
            .await?,
    ))
}

pub fn purchase_request_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/purchase-requests", get(list_requests))
        .route("/purchase-requests/my_requests", get(my_requests))
        .route("/purchase-requests/:id", get(get_request))
        .with_permission(perm::PURCHASE_REQUESTS_READ);

    let write = Router::new()
        .route("/purchase-requests", post(create_request))
        .route(
            "/purchase-requests/:id",
            axum::routing::put(update_request)
                .patch(update_request)
                .delete(delete_request),
        )
        .with_permission(perm::PURCHASE_REQUESTS_CREATE);

    let review = Router::new()
        .route("/purchase-requests/:id/approve", post(approve_request))
        .route("/purchase-requests/:id/reject", post(reject_request))
        .route("/purchase-requests/:id/send-rfq", post(send_rfq))
        .with_permission(perm::PURCHASE_REQUESTS_REVIEW);

    read.merge(write).merge(review)
}
