mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

struct Sourced {
    admin: String,
    vendor_token: String,
    product_id: String,
    request_id: String,
    rfq_id: String,
}

/// Product, approved request and an RFQ sent to a freshly approved vendor.
async fn sourced(app: &TestApp) -> Sourced {
    let admin = app.admin_token().await;
    let (vendor_id, vendor_token) = app.approved_vendor(&admin, "sales@boltworks.test").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Hex bolt M8",
                "unit_of_measure": "pcs",
                "current_stock": 5,
                "unit_price": "12.50"
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/purchase-requests",
            Some(json!({
                "product_id": product_id,
                "quantity": 10,
                "department": "Maintenance",
                "urgency_level": "high",
                "justification": "Line 3 refit"
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["item_name"], "Hex bolt M8");
    assert_eq!(body["status"], "pending");
    let request_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/purchase-requests/{request_id}/approve"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/purchase-requests/{request_id}/send-rfq"),
            Some(json!({
                "vendor_ids": [vendor_id, vendor_id],
                "response_deadline": "2031-01-31",
                "admin_notes": "Quote by end of month"
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let rfqs = body["rfqs"].as_array().unwrap();
    assert_eq!(rfqs.len(), 1, "duplicate vendor ids collapse to one RFQ");
    let rfq_id = rfqs[0]["id"].as_str().unwrap().to_string();

    Sourced {
        admin,
        vendor_token,
        product_id,
        request_id,
        rfq_id,
    }
}

async fn submit_quote(app: &TestApp, s: &Sourced) -> Value {
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/vendor-dashboard/{}/submit_quotation", s.rfq_id),
            Some(json!({
                "unit_price": "100",
                "tax_rate": "18",
                "shipping_cost": "50",
                "estimated_delivery_days": 7,
                "quotation_valid_until": "2031-03-31",
                "warranty_terms": "12 months"
            })),
            Some(&s.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn approved_vendor_gets_first_sequential_code() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (vendor_id, _) = app.approved_vendor(&admin, "first@vendor.test").await;

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/vendors/{vendor_id}"), None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vendor_code"], "VEND-1001");
    assert_eq!(body["status"], "approved");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/vendors/{vendor_id}/approve"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchase_request_is_reviewed_once() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/purchase-requests/{}/approve", s.request_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/purchase-requests/{}/reject", s.request_id),
            Some(json!({ "rejection_reason": "too late" })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quotation_totals_include_tax_and_shipping() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;

    let body = submit_quote(&app, &s).await;
    let quotation = &body["quotation"];
    assert_eq!(quotation["status"], "submitted");
    assert_eq!(quotation["quantity"], 10, "quantity defaults to the request");
    assert_eq!(decimal(&quotation["subtotal"]), dec!(1000));
    assert_eq!(decimal(&quotation["tax_amount"]), dec!(180));
    assert_eq!(decimal(&quotation["total_amount"]), dec!(1230));

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/rfqs/{}", s.rfq_id), None, Some(&s.admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "received");

    // A second quotation for the same RFQ is refused.
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/vendor-dashboard/{}/submit_quotation", s.rfq_id),
            Some(json!({
                "unit_price": "90",
                "estimated_delivery_days": 5,
                "quotation_valid_until": "2031-03-31"
            })),
            Some(&s.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accepting_a_quotation_raises_one_purchase_order() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/rfqs/{}/accept_quotation", s.rfq_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let po = &body["po"];
    assert_eq!(po["status"], "approved");
    assert_eq!(po["total_quantity"], 10);
    assert_eq!(decimal(&po["total_amount"]), dec!(1230));
    assert!(po["po_number"].as_str().unwrap().starts_with("PO-"));
    assert_eq!(body["rfq"]["quotation"]["status"], "accepted");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/rfqs/{}/accept_quotation", s.rfq_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-requests/{}", s.request_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/my_purchase_orders",
            None,
            Some(&s.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn good_receipt_adds_stock_and_closes_the_order() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let (_, accepted) = app
        .call(
            Method::POST,
            &format!("/api/v1/rfqs/{}/accept_quotation", s.rfq_id),
            None,
            Some(&s.admin),
        )
        .await;
    let po_id = accepted["po"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/goods-receipts",
            Some(json!({
                "purchase_order_id": po_id,
                "delivered_quantity": 10,
                "condition": "good",
                "notes": "All cartons intact"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, product) = app
        .call(
            Method::GET,
            &format!("/api/v1/products/{}", s.product_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(product["current_stock"], 15);

    let (_, order) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-orders/{po_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(order["status"], "delivered");
    assert!(order["actual_delivery_date"].is_string());
}

#[tokio::test]
async fn damaged_receipt_leaves_stock_alone() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let (_, accepted) = app
        .call(
            Method::POST,
            &format!("/api/v1/rfqs/{}/accept_quotation", s.rfq_id),
            None,
            Some(&s.admin),
        )
        .await;
    let po_id = accepted["po"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/goods-receipts",
            Some(json!({
                "purchase_order_id": po_id,
                "delivered_quantity": 10,
                "condition": "damaged"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, product) = app
        .call(
            Method::GET,
            &format!("/api/v1/products/{}", s.product_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(product["current_stock"], 5);
}

/// Accepts the submitted quotation and returns the new order id.
async fn accept(app: &TestApp, s: &Sourced) -> String {
    let (status, accepted) = app
        .call(
            Method::POST,
            &format!("/api/v1/rfqs/{}/accept_quotation", s.rfq_id),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{accepted}");
    accepted["po"]["id"].as_str().unwrap().to_string()
}

async fn product_stock(app: &TestApp, s: &Sourced) -> Value {
    let (_, product) = app
        .call(
            Method::GET,
            &format!("/api/v1/products/{}", s.product_id),
            None,
            Some(&s.admin),
        )
        .await;
    product["current_stock"].clone()
}

#[tokio::test]
async fn receipt_items_add_accepted_quantity_to_stock() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let po_id = accept(&app, &s).await;

    let (_, order) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-orders/{po_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    let line_id = order["items"][0]["id"].as_str().unwrap().to_string();

    // A damaged delivery leaves stock to the individual lines.
    let (status, receipt) = app
        .call(
            Method::POST,
            "/api/v1/goods-receipts",
            Some(json!({
                "purchase_order_id": po_id,
                "delivered_quantity": 10,
                "condition": "damaged"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    let receipt_id = receipt["id"].as_str().unwrap().to_string();
    assert_eq!(product_stock(&app, &s).await, 5);

    let (status, item) = app
        .call(
            Method::POST,
            "/api/v1/goods-receipt-items",
            Some(json!({
                "goods_receipt_id": receipt_id,
                "purchase_order_item_id": line_id,
                "quantity_received": 10,
                "quantity_accepted": 8,
                "quantity_rejected": 2,
                "rejection_reason": "Stripped threads"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    assert_eq!(item["quantity_accepted"], 8);
    assert_eq!(product_stock(&app, &s).await, 13);

    let (_, line) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-order-items/{line_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(line["received_quantity"], 10);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/goods-receipt-items",
            Some(json!({
                "goods_receipt_id": receipt_id,
                "purchase_order_item_id": line_id,
                "quantity_received": i32::MAX,
                "quantity_accepted": 1
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "Received quantity is too large");
    assert_eq!(product_stock(&app, &s).await, 13);
}

#[tokio::test]
async fn status_updates_need_an_assignment_and_a_known_status() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let po_id = accept(&app, &s).await;
    let (employee_id, employee) = app.employee(&s.admin, "kiran").await;
    let uri = format!("/api/v1/purchase-orders/{po_id}/update-status");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "status": "in_progress" })),
            Some(&employee),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["message"], "You are not assigned to this purchase order");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{po_id}"),
            Some(json!({ "assigned_to": employee_id })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .call(Method::POST, &uri, Some(json!({ "status": "shipped" })), Some(&employee))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(
        body["message"],
        "Invalid status. Must be one of: pending, in_progress, received, delivered, delayed"
    );

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "status": "delayed", "reason": "Port congestion" })),
            Some(&employee),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["purchase_order"]["status"], "delayed");
    assert_eq!(body["purchase_order"]["delay_reason"], "Port congestion");
    assert_eq!(body["purchase_order"]["status_updated_by"], employee_id.as_str());
}

#[tokio::test]
async fn rejected_quotation_closes_the_rfq() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    let uri = format!("/api/v1/rfqs/{}/reject_quotation", s.rfq_id);

    let (status, body) = app.call(Method::POST, &uri, None, Some(&s.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "No quotation submitted for this RFQ");

    submit_quote(&app, &s).await;
    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "review_notes": "Price above budget" })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rfq"]["status"], "rejected");
    assert_eq!(body["rfq"]["quotation"]["status"], "rejected");
    assert_eq!(body["rfq"]["quotation"]["review_notes"], "Price above budget");

    let (_, orders) = app
        .call(Method::GET, "/api/v1/purchase-orders", None, Some(&s.admin))
        .await;
    assert_eq!(orders.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn deleting_an_employee_clears_their_references() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let po_id = accept(&app, &s).await;
    let (employee_id, employee) = app.employee(&s.admin, "anita").await;

    let (status, request) = app
        .call(
            Method::POST,
            "/api/v1/purchase-requests",
            Some(json!({
                "item_name": "Cable ties",
                "quantity": 200,
                "department": "Stores",
                "justification": "Rack wiring"
            })),
            Some(&employee),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(request["employee_id"], employee_id.as_str());
    let request_id = request["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{po_id}"),
            Some(json!({ "assigned_to": employee_id })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/employees/{employee_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, request) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-requests/{request_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert!(request["employee_id"].is_null(), "{request}");

    let (_, order) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-orders/{po_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert!(order["assigned_to"].is_null(), "{order}");
}

#[tokio::test]
async fn out_of_range_quotations_are_refused() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    let uri = format!("/api/v1/vendor-dashboard/{}/submit_quotation", s.rfq_id);

    for (field, value) in [
        ("estimated_delivery_days", json!(2_000_000_000)),
        ("unit_price", json!("79228162514264337593543950335")),
        ("unit_price", json!("10.333")),
    ] {
        let mut quote = json!({
            "unit_price": "100",
            "tax_rate": "18",
            "shipping_cost": "50",
            "estimated_delivery_days": 7,
            "quotation_valid_until": "2031-03-31"
        });
        quote[field] = value;
        let (status, body) = app
            .call(Method::POST, &uri, Some(quote), Some(&s.vendor_token))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}: {body}");
    }

    // The RFQ stays open for a valid quote.
    submit_quote(&app, &s).await;
}

#[tokio::test]
async fn order_lines_keep_cents_exact() {
    let app = TestApp::new().await;
    let s = sourced(&app).await;
    submit_quote(&app, &s).await;
    let po_id = accept(&app, &s).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/purchase-order-items",
            Some(json!({
                "purchase_order_id": po_id,
                "product_name": "Washers",
                "quantity": 3,
                "unit_price": "0.333"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/purchase-order-items",
            Some(json!({
                "purchase_order_id": po_id,
                "product_name": "Washers",
                "quantity": 3,
                "unit_price": "0.33"
            })),
            Some(&s.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["line_total"]), dec!(0.99));

    let (_, order) = app
        .call(
            Method::GET,
            &format!("/api/v1/purchase-orders/{po_id}"),
            None,
            Some(&s.admin),
        )
        .await;
    assert_eq!(decimal(&order["subtotal"]), dec!(1000.99));
    assert_eq!(order["total_quantity"], 13);
}
