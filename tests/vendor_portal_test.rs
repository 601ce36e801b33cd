mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{read_json, TestApp};
use serde_json::json;

const BOUNDARY: &str = "----procurement-test-boundary";

fn multipart_upload(uri: &str, token: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn portal_is_closed_to_non_vendors() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    // Staff without a vendor link hold no portal permission.
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/employees",
            Some(json!({
                "username": "meera",
                "email": "meera@corp.test",
                "first_name": "Meera",
                "last_name": "Iyer",
                "department": "Stores",
                "position": "Clerk"
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let temporary = body["temporary_password"].as_str().unwrap().to_string();

    let (status, login) = app.login("meera", &temporary).await;
    assert_eq!(status, StatusCode::OK, "{login}");
    let employee = common::token_of(&login);

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/dashboard_stats",
            None,
            Some(&employee),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins pass the guard but have no vendor record behind them.
    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/dashboard_stats",
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn vendors_cannot_reach_back_office_routes() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    for uri in ["/api/v1/purchase-orders", "/api/v1/invoices", "/api/v1/vendors"] {
        let (status, _) = app
            .call(Method::GET, uri, None, Some(&order.vendor_token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn dashboard_counts_the_vendors_own_work() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    let (status, stats) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/dashboard_stats",
            None,
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_rfqs"], 1);
    assert_eq!(stats["accepted_quotations"], 1);
    assert_eq!(stats["total_orders"], 1);
    assert_eq!(stats["pending_payments"], 0);

    let (status, rfqs) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/my_rfqs",
            None,
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rfqs.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn vendor_updates_delivery_progress() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/vendor-dashboard/{}/update_delivery_status", order.po_id),
            Some(json!({
                "delivery_status": "shipped",
                "shipment_date": "2030-01-05",
                "tracking_number": "AWB123456"
            })),
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Delivery status updated successfully");
    assert_eq!(body["purchase_order"]["delivery_status"], "shipped");
    assert_eq!(body["purchase_order"]["tracking_number"], "AWB123456");
}

#[tokio::test]
async fn invoice_document_upload_checks_the_file_type() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/vendor-dashboard/create_invoice",
            Some(json!({
                "purchase_order": order.po_id,
                "invoice_number": "GLV/2030/7",
                "invoice_date": "2030-01-10",
                "due_date": "2030-02-09"
            })),
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let invoice_id = created["invoice"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/vendor-dashboard/{invoice_id}/upload_invoice");

    let response = app
        .send(multipart_upload(&uri, &order.vendor_token, "invoice_file", "invoice.exe", b"MZ"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().starts_with("Invalid file type"));

    let response = app
        .send(multipart_upload(&uri, &order.vendor_token, "other", "invoice.pdf", b"%PDF-1.4"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["message"], "No file provided");

    let response = app
        .send(multipart_upload(&uri, &order.vendor_token, "invoice_file", "invoice.PDF", b"%PDF-1.4"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Invoice uploaded successfully");
    let stored = body["invoice"]["invoice_file"].as_str().unwrap().to_string();
    assert!(stored.starts_with("invoices/"), "{stored}");
    assert!(stored.contains("GLV_2030_7_"), "{stored}");
    assert!(stored.ends_with(".pdf"), "{stored}");

    let on_disk = std::path::Path::new(&app.state.config.upload_dir).join(&stored);
    assert_eq!(std::fs::read(on_disk).unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn notifications_can_be_cleared_in_bulk() {
    let app = TestApp::new().await;
    let order = app.ordered().await;

    // RFQ and purchase order notices for the vendor.
    let (status, notes) = app
        .call(Method::GET, "/api/v1/notifications", None, Some(&order.vendor_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let notes = notes.as_array().unwrap().clone();
    assert!(notes.len() >= 2, "{notes:?}");
    assert!(notes.iter().all(|n| n["read"] == false));

    let first = notes[0]["id"].as_str().unwrap();
    let (status, marked) = app
        .call(
            Method::POST,
            &format!("/api/v1/notifications/{first}/mark_read"),
            None,
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["read"], true);

    // Another user's notification is not visible.
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/notifications/{first}/mark_read"),
            None,
            Some(&order.admin),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/notifications/mark-all-read",
            None,
            Some(&order.vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All notifications marked as read");

    let (_, notes) = app
        .call(Method::GET, "/api/v1/notifications", None, Some(&order.vendor_token))
        .await;
    assert!(notes.as_array().unwrap().iter().all(|n| n["read"] == true));
}
