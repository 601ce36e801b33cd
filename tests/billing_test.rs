mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp, GATEWAY_KEY_ID, GATEWAY_SECRET};
use procurement_api::services::payment_gateway::checkout_signature;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn vendor_invoice(app: &TestApp, vendor_token: &str, po_id: &str) -> Value {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/vendor-dashboard/create_invoice",
            Some(json!({
                "purchase_order": po_id,
                "invoice_number": "GLV-0001",
                "invoice_date": "2030-01-10",
                "due_date": "2030-02-09",
                "notes": "Net 30"
            })),
            Some(vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn vendor_invoice_defaults_to_order_amounts_and_alerts_admins() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    let body = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice = &body["invoice"];
    assert_eq!(invoice["status"], "pending");
    assert_eq!(decimal(&invoice["total_amount"]), dec!(1230));
    assert_eq!(decimal(&invoice["balance_due"]), dec!(1230));
    assert_eq!(invoice["vendor_id"], order.vendor_id.as_str());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/vendor-dashboard/create_invoice",
            Some(json!({
                "purchase_order": order.po_id,
                "invoice_number": "GLV-0002",
                "invoice_date": "2030-01-10",
                "due_date": "2030-02-09"
            })),
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "one invoice per order");

    let (status, notes) = app
        .call(Method::GET, "/api/v1/notifications", None, Some(&order.admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<&str> = notes
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["message"].as_str())
        .collect();
    assert!(
        messages.iter().any(|m| m.starts_with("New invoice GLV-0001")),
        "{messages:?}"
    );
}

#[tokio::test]
async fn manual_payment_reduces_balance_until_settled() {
    let app = TestApp::new().await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice_id = invoice["invoice"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice_id,
                "amount": "230",
                "payment_method": "bank_transfer",
                "transaction_reference": "NEFT-1"
            })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["payment_number"].is_string());

    let invoice_uri = format!("/api/v1/invoices/{invoice_id}");
    let (_, current) = app
        .call(Method::GET, &invoice_uri, None, Some(&order.admin))
        .await;
    assert_eq!(decimal(&current["balance_due"]), dec!(1000));
    assert_eq!(current["status"], "pending");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice_id,
                "amount": "1000",
                "payment_method": "cash"
            })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, current) = app
        .call(Method::GET, &invoice_uri, None, Some(&order.admin))
        .await;
    assert_eq!(current["status"], "paid");
    assert_eq!(decimal(&current["balance_due"]), dec!(0));
}

#[tokio::test]
async fn non_positive_payment_is_rejected() {
    let app = TestApp::new().await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "invoice_id": invoice["invoice"]["id"],
                "amount": "0",
                "payment_method": "cash"
            })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hosted_checkout_payment_is_verified_and_recorded() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_N1x",
            "amount": 123000,
            "currency": "INR",
            "receipt": "invoice_GLV-0001",
            "status": "created"
        })))
        .expect(1)
        .mount(&gateway)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_N1x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_N1x",
            "amount": 123000,
            "currency": "INR",
            "status": "captured",
            "order_id": "order_N1x"
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice_id = invoice["invoice"]["id"].as_str().unwrap().to_string();

    let (status, checkout) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/create-razorpay-order"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{checkout}");
    assert_eq!(checkout["order_id"], "order_N1x");
    assert_eq!(checkout["amount"], 123000);
    assert_eq!(checkout["key_id"], GATEWAY_KEY_ID);
    assert_eq!(checkout["invoice_number"], "GLV-0001");

    let verify_uri = format!("/api/v1/invoices/{invoice_id}/verify-razorpay-payment");
    let (status, body) = app
        .call(
            Method::POST,
            &verify_uri,
            Some(json!({
                "razorpay_payment_id": "pay_N1x",
                "razorpay_order_id": "order_N1x",
                "razorpay_signature": "deadbeef"
            })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid payment signature");

    let signature = checkout_signature(GATEWAY_SECRET, "order_N1x", "pay_N1x").unwrap();
    let (status, body) = app
        .call(
            Method::POST,
            &verify_uri,
            Some(json!({
                "razorpay_payment_id": "pay_N1x",
                "razorpay_order_id": "order_N1x",
                "razorpay_signature": signature
            })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["payment"]["payment_method"], "razorpay");
    assert_eq!(decimal(&body["payment"]["amount"]), dec!(1230));
    assert_eq!(body["invoice"]["status"], "paid");

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/create-razorpay-order"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "paid invoices have no checkout");
}

#[tokio::test]
async fn verification_requires_every_gateway_field() {
    let app = TestApp::new().await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice_id = invoice["invoice"]["id"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{invoice_id}/verify-razorpay-payment"),
            Some(json!({ "razorpay_payment_id": "pay_1" })),
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing payment details");
}

#[tokio::test]
async fn invoice_download_is_a_pdf() {
    let app = TestApp::new().await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice_id = invoice["invoice"]["id"].as_str().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}/download"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/pdf"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn gateway_payment_is_recorded_only_once() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_part"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_part",
            "amount": 100000,
            "currency": "INR",
            "status": "captured",
            "order_id": "order_part"
        })))
        .mount(&gateway)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_rest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_rest",
            "amount": 23000,
            "currency": "INR",
            "status": "captured",
            "order_id": "order_rest"
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;
    let order = app.ordered().await;
    let invoice = vendor_invoice(&app, &order.vendor_token, &order.po_id).await;
    let invoice_id = invoice["invoice"]["id"].as_str().unwrap().to_string();
    let verify_uri = format!("/api/v1/invoices/{invoice_id}/verify-razorpay-payment");

    let confirmation = |order_id: &str, payment_id: &str| {
        json!({
            "razorpay_payment_id": payment_id,
            "razorpay_order_id": order_id,
            "razorpay_signature": checkout_signature(GATEWAY_SECRET, order_id, payment_id).unwrap()
        })
    };

    let (status, body) = app
        .call(Method::POST, &verify_uri, Some(confirmation("order_part", "pay_part")), Some(&order.admin))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["invoice"]["paid_amount"]), dec!(1000));
    assert_eq!(body["invoice"]["status"], "pending");

    // The same signed confirmation a second time.
    let (status, body) = app
        .call(Method::POST, &verify_uri, Some(confirmation("order_part", "pay_part")), Some(&order.admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["message"], "This payment has already been recorded");

    let (_, stored) = app
        .call(Method::GET, &format!("/api/v1/invoices/{invoice_id}"), None, Some(&order.admin))
        .await;
    assert_eq!(decimal(&stored["paid_amount"]), dec!(1000));

    let (status, body) = app
        .call(Method::POST, &verify_uri, Some(confirmation("order_rest", "pay_rest")), Some(&order.admin))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["invoice"]["status"], "paid");

    // Nothing more is taken once the invoice is settled.
    let (status, body) = app
        .call(Method::POST, &verify_uri, Some(confirmation("order_late", "pay_late")), Some(&order.admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "Invoice is already paid");

    let (_, payments) = app
        .call(
            Method::GET,
            &format!("/api/v1/payments?invoice={invoice_id}"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(payments.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn download_filename_is_header_safe() {
    let app = TestApp::new().await;
    let order = app.ordered().await;
    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/vendor-dashboard/create_invoice",
            Some(json!({
                "purchase_order": order.po_id,
                "invoice_number": "GLV \"7\"\t",
                "invoice_date": "2030-01-10",
                "due_date": "2030-02-09"
            })),
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let invoice_id = created["invoice"]["id"].as_str().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{invoice_id}/download"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"invoice_GLV__7__.pdf\""
    );
}
