use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{created_response, no_content_response, success_response},
    models::payment,
    services::billing::{
        CreateInvoice, CreatePayment, GatewayCheckout, GatewayPaymentConfirmation, InvoiceFilter,
        InvoiceView, PaymentFilter, RecordedPayment, UpdateInvoice,
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceFilter),
    responses((status = 200, description = "Invoices, newest first", body = [InvoiceView])),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.billing.list_invoices(filter).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoice,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceView),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoice>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.billing.create_invoice(payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.billing.get_invoice(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    request_body = UpdateInvoice,
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses((status = 200, description = "Invoice updated", body = InvoiceView)),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoice>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.billing.update_invoice(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 204, description = "Invoice deleted"),
        (status = 400, description = "Invoice has payments", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.billing.delete_invoice(id).await?;
    Ok(no_content_response())
}

/// Render the invoice as a PDF attachment
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}/download",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn download_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let file = state.services.billing.download(id).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}

/// Open a gateway checkout order for the outstanding balance
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/create-razorpay-order",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Checkout order created", body = GatewayCheckout),
        (status = 400, description = "Invoice already paid", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn create_gateway_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.billing.create_gateway_order(id).await?,
    ))
}

/// Verify the checkout signature and record the payment
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/verify-razorpay-payment",
    request_body = GatewayPaymentConfirmation,
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 201, description = "Payment recorded", body = RecordedPayment),
        (status = 400, description = "Missing details or bad signature", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices",
    security(("bearer_auth" = []))
)]
pub async fn verify_gateway_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<GatewayPaymentConfirmation>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    Ok(created_response(
        state
            .services
            .billing
            .verify_gateway_payment(id, user.user_id, payload)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaymentFilter),
    responses((status = 200, description = "Payments, newest first", body = [payment::Model])),
    tag = "payments",
    security(("bearer_auth" = []))
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(filter): Query<PaymentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.billing.list_payments(filter).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses((status = 200, description = "Payment", body = payment::Model)),
    tag = "payments",
    security(("bearer_auth" = []))
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.billing.get_payment(id).await?))
}

/// Record an offline payment against an invoice
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = payment::Model),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "payments",
    security(("bearer_auth" = []))
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePayment>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .billing
            .create_payment(user.user_id, payload)
            .await?,
    ))
}

pub fn billing_routes() -> Router<AppState> {
    let invoices_read = Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/:id", get(get_invoice))
        .route("/invoices/:id/download", get(download_invoice))
        .with_permission(perm::INVOICES_READ);

    let invoices_manage = Router::new()
        .route("/invoices", post(create_invoice))
        .route(
            "/invoices/:id",
            axum::routing::put(update_invoice)
                .patch(update_invoice)
                .delete(delete_invoice),
        )
        .with_permission(perm::INVOICES_MANAGE);

    let payments_read = Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/:id", get(get_payment))
        .with_permission(perm::PAYMENTS_READ);

    let payments_manage = Router::new()
        .route("/payments", post(create_payment))
        .route(
            "/invoices/:id/create-razorpay-order",
            post(create_gateway_order),
        )
        .route(
            "/invoices/:id/verify-razorpay-payment",
            post(verify_gateway_payment),
        )
        .with_permission(perm::PAYMENTS_MANAGE);

    invoices_read
        .merge(invoices_manage)
        .merge(payments_read)
        .merge(payments_manage)
}
