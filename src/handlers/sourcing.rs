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
    handlers::common::{created_response, success_response},
    models::vendor_quotation,
    services::sourcing::{
        AcceptedQuotation, CreateQuotation, QuotationFilter, RejectQuotation, RejectedQuotation,
        RfqDetail, RfqFilter, SubmittedQuotation, UpdateQuotation,
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/rfqs",
    params(RfqFilter),
    responses((status = 200, description = "RFQs, newest sent first", body = [RfqDetail])),
    tag = "rfqs",
    security(("bearer_auth" = []))
)]
pub async fn list_rfqs(
    State(state): State<AppState>,
    Query(filter): Query<RfqFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.sourcing.list_rfqs(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/rfqs/{id}",
    params(("id" = Uuid, Path, description = "RFQ ID")),
    responses(
        (status = 200, description = "RFQ with its quotation", body = RfqDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "rfqs",
    security(("bearer_auth" = []))
)]
pub async fn get_rfq(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.sourcing.get_rfq(id).await?))
}

/// Accept the submitted quotation of an RFQ and raise a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/rfqs/{id}/accept_quotation",
    params(("id" = Uuid, Path, description = "RFQ ID")),
    responses(
        (status = 200, description = "Quotation accepted, purchase order created", body = AcceptedQuotation),
        (status = 400, description = "No submitted quotation", body = crate::errors::ErrorResponse)
    ),
    tag = "rfqs",
    security(("bearer_auth" = []))
)]
pub async fn accept_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .sourcing
            .accept_quotation(id, user.user_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/rfqs/{id}/reject_quotation",
    request_body = RejectQuotation,
    params(("id" = Uuid, Path, description = "RFQ ID")),
    responses(
        (status = 200, description = "Quotation rejected", body = RejectedQuotation),
        (status = 400, description = "No quotation submitted for this RFQ", body = crate::errors::ErrorResponse)
    ),
    tag = "rfqs",
    security(("bearer_auth" = []))
)]
pub async fn reject_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectQuotation>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    Ok(success_response(
        state
            .services
            .sourcing
            .reject_quotation(id, user.user_id, payload)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-quotations",
    params(QuotationFilter),
    responses((status = 200, description = "Quotations", body = [vendor_quotation::Model])),
    tag = "vendor-quotations",
    security(("bearer_auth" = []))
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    Query(filter): Query<QuotationFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.sourcing.list_quotations(filter).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation ID")),
    responses((status = 200, description = "Quotation", body = vendor_quotation::Model)),
    tag = "vendor-quotations",
    security(("bearer_auth" = []))
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.sourcing.get_quotation(id).await?))
}

/// Draft a quotation for an RFQ; totals are derived on save
#[utoipa::path(
    post,
    path = "/api/v1/vendor-quotations",
    request_body = CreateQuotation,
    responses(
        (status = 201, description = "Quotation drafted", body = vendor_quotation::Model),
        (status = 400, description = "Quotation already exists for this RFQ", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-quotations",
    security(("bearer_auth" = []))
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuotation>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.sourcing.create_quotation(payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/vendor-quotations/{id}",
    request_body = UpdateQuotation,
    params(("id" = Uuid, Path, description = "Quotation ID")),
    responses((status = 200, description = "Quotation updated", body = vendor_quotation::Model)),
    tag = "vendor-quotations",
    security(("bearer_auth" = []))
)]
pub async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotation>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.sourcing.update_quotation(id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendor-quotations/{id}/submit",
    params(("id" = Uuid, Path, description = "Quotation ID")),
    responses(
        (status = 200, description = "Quotation submitted", body = SubmittedQuotation),
        (status = 400, description = "Only draft quotations can be submitted", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-quotations",
    security(("bearer_auth" = []))
)]
pub async fn submit_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.sourcing.submit_quotation(id).await?,
    ))
}

pub fn sourcing_routes() -> Router<AppState> {
    let rfqs_read = Router::new()
        .route("/rfqs", get(list_rfqs))
        .route("/rfqs/:id", get(get_rfq))
        .with_permission(perm::RFQS_READ);

    let rfqs_manage = Router::new()
        .route("/rfqs/:id/accept_quotation", post(accept_quotation))
        .route("/rfqs/:id/reject_quotation", post(reject_quotation))
        .with_permission(perm::RFQS_MANAGE);

    let quotations_read = Router::new()
        .route("/vendor-quotations", get(list_quotations))
        .route("/vendor-quotations/:id", get(get_quotation))
        .with_permission(perm::QUOTATIONS_READ);

    let quotations_manage = Router::new()
        .route("/vendor-quotations", post(create_quotation))
        .route(
            "/vendor-quotations/:id",
            axum::routing::put(update_quotation).patch(update_quotation),
        )
        .route("/vendor-quotations/:id/submit", post(submit_quotation))
        .with_permission(perm::QUOTATIONS_MANAGE);

    rfqs_read
        .merge(rfqs_manage)
        .merge(quotations_read)
        .merge(quotations_manage)
}
