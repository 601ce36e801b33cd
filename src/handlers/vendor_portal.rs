//! Self-service endpoints for vendor logins under `/vendor-dashboard`.

use axum::{
    extract::{Json, Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, success_response},
    models::vendor_quotation,
    services::{
        billing::InvoiceView,
        ordering::PurchaseOrderDetail,
        sourcing::RfqDetail,
        vendor_portal::{
            DeliveryUpdate, DeliveryUpdated, InvoiceMessage, InvoiceUpload, PortalStatusFilter,
            QuotationMessage, QuotationSubmission, VendorInvoiceSubmission, VendorStats,
        },
    },
    AppState,
};

/// Multipart field carrying the invoice document.
const INVOICE_FILE_FIELD: &str = "invoice_file";

#[utoipa::path(
    get,
    path = "/api/v1/vendor-dashboard/dashboard_stats",
    responses(
        (status = 200, description = "Vendor counters", body = VendorStats),
        (status = 403, description = "No vendor account", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.vendor_portal.dashboard_stats(&user).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-dashboard/my_rfqs",
    params(PortalStatusFilter),
    responses((status = 200, description = "RFQs sent to the vendor", body = [RfqDetail])),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn my_rfqs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<PortalStatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.vendor_portal.my_rfqs(&user, filter).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-dashboard/my_quotations",
    params(PortalStatusFilter),
    responses((status = 200, description = "Vendor's quotations", body = [vendor_quotation::Model])),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn my_quotations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<PortalStatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .vendor_portal
            .my_quotations(&user, filter)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-dashboard/my_purchase_orders",
    params(PortalStatusFilter),
    responses((status = 200, description = "Orders placed with the vendor", body = [PurchaseOrderDetail])),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn my_purchase_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<PortalStatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .vendor_portal
            .my_purchase_orders(&user, filter)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-dashboard/my_invoices",
    responses((status = 200, description = "Vendor's invoices", body = [InvoiceView])),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn my_invoices(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.vendor_portal.my_invoices(&user).await?,
    ))
}

/// Report shipment progress on one of the vendor's orders
#[utoipa::path(
    post,
    path = "/api/v1/vendor-dashboard/{id}/update_delivery_status",
    request_body = DeliveryUpdate,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Delivery status updated", body = DeliveryUpdated),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(po_id): Path<Uuid>,
    Json(payload): Json<DeliveryUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .vendor_portal
            .update_delivery_status(&user, po_id, payload)
            .await?,
    ))
}

/// Attach a document to one of the vendor's invoices (`invoice_file` multipart field)
#[utoipa::path(
    post,
    path = "/api/v1/vendor-dashboard/{id}/upload_invoice",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice uploaded", body = InvoiceMessage),
        (status = 400, description = "Missing, oversized or unsupported file", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn upload_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(e.body_text()))?
    {
        if field.name() != Some(INVOICE_FILE_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::ValidationError(e.body_text()))?;
        upload = Some(InvoiceUpload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload
        .filter(|u| !u.filename.is_empty())
        .ok_or_else(|| ServiceError::ValidationError("No file provided".to_string()))?;

    Ok(success_response(
        state
            .services
            .vendor_portal
            .upload_invoice(&user, invoice_id, upload)
            .await?,
    ))
}

/// Quote for one of the vendor's RFQs
#[utoipa::path(
    post,
    path = "/api/v1/vendor-dashboard/{id}/submit_quotation",
    request_body = QuotationSubmission,
    params(("id" = Uuid, Path, description = "RFQ ID")),
    responses(
        (status = 201, description = "Quotation submitted", body = QuotationMessage),
        (status = 400, description = "RFQ closed or already quoted", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn submit_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(rfq_id): Path<Uuid>,
    Json(payload): Json<QuotationSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .vendor_portal
            .submit_quotation(&user, rfq_id, payload)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendor-dashboard/create_invoice",
    request_body = VendorInvoiceSubmission,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceMessage),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-dashboard",
    security(("bearer_auth" = []))
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VendorInvoiceSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .vendor_portal
            .create_invoice(&user, payload)
            .await?,
    ))
}

pub fn vendor_portal_routes() -> Router<AppState> {
    Router::new()
        .route("/vendor-dashboard/dashboard_stats", get(dashboard_stats))
        .route("/vendor-dashboard/my_rfqs", get(my_rfqs))
        .route("/vendor-dashboard/my_quotations", get(my_quotations))
        .route("/vendor-dashboard/my_purchase_orders", get(my_purchase_orders))
        .route("/vendor-dashboard/my_invoices", get(my_invoices))
        .route("/vendor-dashboard/create_invoice", post(create_invoice))
        .route(
            "/vendor-dashboard/:id/update_delivery_status",
            post(update_delivery_status),
        )
        .route("/vendor-dashboard/:id/upload_invoice", post(upload_invoice))
        .route("/vendor-dashboard/:id/submit_quotation", post(submit_quotation))
        .with_permission(perm::VENDOR_PORTAL_ACCESS)
}
