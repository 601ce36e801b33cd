use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Procurement API",
        version = "1.0.0",
        description = r#"
# Procurement API

Purchase-to-pay workflow for an organisation and its vendors: purchase
requests, requests for quotation, vendor quotations, purchase orders, goods
receipts, invoices and payments, plus a self-service portal for vendors.

## Authentication

Sign in with `POST /api/v1/auth/login` and send the access token on every
other call:

```
Authorization: Bearer <access-token>
```

## Error Handling

Errors share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Only pending requests can be approved",
  "request_id": "5f1c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign-in, tokens and vendor self-registration"),
        (name = "employees", description = "Employee accounts and the admin dashboard"),
        (name = "vendors", description = "Vendor master data and approval"),
        (name = "catalog", description = "Categories and products"),
        (name = "purchase-requests", description = "Internal purchase requests"),
        (name = "rfqs", description = "Requests for quotation"),
        (name = "vendor-quotations", description = "Vendor quotations"),
        (name = "purchase-orders", description = "Purchase orders and fulfilment"),
        (name = "purchase-order-items", description = "Purchase order lines"),
        (name = "goods-receipts", description = "Deliveries received against orders"),
        (name = "invoices", description = "Vendor invoices and online payment"),
        (name = "payments", description = "Payments against invoices"),
        (name = "notifications", description = "In-app notifications"),
        (name = "vendor-dashboard", description = "Vendor self-service portal"),
        (name = "system", description = "Health and status")
    ),
    paths(
        crate::health_check,
        crate::api_status,

        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::csrf,
        handlers::auth::logout,
        handlers::auth::check,
        handlers::auth::current_user,
        handlers::auth::register_vendor,
        handlers::auth::change_password,

        handlers::employees::list_employees,
        handlers::employees::create_employee,
        handlers::employees::get_employee,
        handlers::employees::update_employee,
        handlers::employees::delete_employee,
        handlers::employees::activate_employee,
        handlers::employees::deactivate_employee,
        handlers::employees::reset_employee_password,
        handlers::employees::dashboard_stats,

        handlers::vendors::list_vendors,
        handlers::vendors::create_vendor,
        handlers::vendors::get_vendor,
        handlers::vendors::update_vendor,
        handlers::vendors::delete_vendor,
        handlers::vendors::approve_vendor,
        handlers::vendors::reject_vendor,
        handlers::vendors::create_vendor_account,
        handlers::vendors::reset_vendor_password,

        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::get_category,
        handlers::catalog::update_category,
        handlers::catalog::delete_category,
        handlers::catalog::list_products,
        handlers::catalog::create_product,
        handlers::catalog::get_product,
        handlers::catalog::update_product,
        handlers::catalog::delete_product,
        handlers::catalog::activate_product,
        handlers::catalog::deactivate_product,

        handlers::purchase_requests::list_requests,
        handlers::purchase_requests::my_requests,
        handlers::purchase_requests::create_request,
        handlers::purchase_requests::get_request,
        handlers::purchase_requests::update_request,
        handlers::purchase_requests::delete_request,
        handlers::purchase_requests::approve_request,
        handlers::purchase_requests::reject_request,
        handlers::purchase_requests::send_rfq,

        handlers::sourcing::list_rfqs,
        handlers::sourcing::get_rfq,
        handlers::sourcing::accept_quotation,
        handlers::sourcing::reject_quotation,
        handlers::sourcing::list_quotations,
        handlers::sourcing::get_quotation,
        handlers::sourcing::create_quotation,
        handlers::sourcing::update_quotation,
        handlers::sourcing::submit_quotation,

        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::assigned_purchase_orders,
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::update_purchase_order,
        handlers::purchase_orders::delete_purchase_order,
        handlers::purchase_orders::receive_purchase_order,
        handlers::purchase_orders::update_purchase_order_status,
        handlers::purchase_orders::list_order_items,
        handlers::purchase_orders::get_order_item,
        handlers::purchase_orders::create_order_item,
        handlers::purchase_orders::update_order_item,
        handlers::purchase_orders::delete_order_item,

        handlers::goods_receipts::list_receipts,
        handlers::goods_receipts::create_receipt,
        handlers::goods_receipts::get_receipt,
        handlers::goods_receipts::list_receipt_items,
        handlers::goods_receipts::create_receipt_item,

        handlers::billing::list_invoices,
        handlers::billing::create_invoice,
        handlers::billing::get_invoice,
        handlers::billing::update_invoice,
        handlers::billing::delete_invoice,
        handlers::billing::download_invoice,
        handlers::billing::create_gateway_order,
        handlers::billing::verify_gateway_payment,
        handlers::billing::list_payments,
        handlers::billing::get_payment,
        handlers::billing::create_payment,

        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,

        handlers::vendor_portal::dashboard_stats,
        handlers::vendor_portal::my_rfqs,
        handlers::vendor_portal::my_quotations,
        handlers::vendor_portal::my_purchase_orders,
        handlers::vendor_portal::my_invoices,
        handlers::vendor_portal::update_delivery_status,
        handlers::vendor_portal::upload_invoice,
        handlers::vendor_portal::submit_quotation,
        handlers::vendor_portal::create_invoice,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            handlers::common::MessageBody,
        )
    )
)]
pub struct ApiDocV1;

/// Registers the `bearer_auth` scheme referenced by the secured paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_workflow_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Procurement API"));
        assert!(json.contains("/api/v1/purchase-requests/{id}/send-rfq"));
        assert!(json.contains("/api/v1/rfqs/{id}/accept_quotation"));
        assert!(json.contains("/api/v1/vendor-dashboard/{id}/upload_invoice"));
        assert!(json.contains("bearer_auth"));
    }
}
