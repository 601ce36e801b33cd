mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_PASSWORD};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn admin_login_returns_tokens_and_profile() {
    let app = TestApp::new().await;
    let _ = app.admin_token().await;

    let (status, body) = app.login("admin", ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
}

#[rstest]
#[case("admin", "wrong-password")]
#[case("nobody", "whatever-password")]
#[tokio::test]
async fn bad_credentials_are_unauthorized(#[case] username: &str, #[case] password: &str) {
    let app = TestApp::new().await;
    let _ = app.admin_token().await;

    let (status, body) = app.login(username, password).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn pending_vendor_cannot_sign_in() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/vendor/register",
            Some(json!({
                "company_name": "Acme Fasteners",
                "contact_person": "Ravi Kumar",
                "email": "ravi@acme.test",
                "phone": "9845000000",
                "password": "acme-password"
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["vendor"]["status"], "pending");
    assert_eq!(body["vendor"]["username"], "ravi");

    let (status, _) = app.login("ravi", "acme-password").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_lists_missing_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/vendor/register",
            Some(json!({ "company_name": "Acme" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("contact_person"), "{message}");
    assert!(message.contains("password"), "{message}");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/auth/check", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);

    let (status, body) = app
        .call(Method::POST, "/api/v1/auth/logout", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout successful");

    let (status, _) = app
        .call(Method::GET, "/api/v1/auth/check", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;

    let (status, _) = app.call(Method::GET, "/api/v1/vendors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/v1/vendors", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn vendor_rejection_needs_a_reason() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/vendor/register",
            Some(json!({
                "company_name": "Nimbus Tools",
                "contact_person": "Asha Rao",
                "email": "asha@nimbus.test",
                "phone": "9845011111",
                "password": "nimbus-password"
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let uri = format!("/api/v1/vendors/{}/reject", body["vendor"]["id"].as_str().unwrap());

    for payload in [None, Some(json!({})), Some(json!({ "rejection_reason": "   " }))] {
        let (status, body) = app.call(Method::POST, &uri, payload, Some(&admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["message"], "Rejection reason is required");
    }

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "rejection_reason": "GST certificate missing" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["vendor"]["status"], "rejected");
    assert_eq!(body["vendor"]["rejection_reason"], "GST certificate missing");
}

#[tokio::test]
async fn passwords_can_only_be_changed_by_their_owner() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (own_id, own) = app.employee(&admin, "deepa").await;
    let (other_id, _) = app.employee(&admin, "farhan").await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/employees/{other_id}/change-password"),
            Some(json!({ "current_password": "anything", "new_password": "new-password-1" })),
            Some(&own),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["message"], "You can only change your own password");

    let uri = format!("/api/v1/employees/{own_id}/change-password");
    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(json!({ "current_password": "not-my-password", "new_password": "new-password-1" })),
            Some(&own),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "Current password is incorrect");
}

#[tokio::test]
async fn changed_password_replaces_the_temporary_one() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (status, created) = app
        .call(
            Method::POST,
            "/api/v1/employees",
            Some(json!({ "username": "gauri", "email": "gauri@corp.test" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap();
    let temporary = created["temporary_password"].as_str().unwrap();
    let (_, login) = app.login("gauri", temporary).await;
    let token = common::token_of(&login);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/employees/{id}/change-password"),
            Some(json!({ "current_password": temporary, "new_password": "gauri-password-2" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app.login("gauri", temporary).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("gauri", "gauri-password-2").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_employee_loses_access_immediately() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (id, token) = app.employee(&admin, "harish").await;

    let (status, _) = app
        .call(Method::GET, "/api/v1/auth/current-user", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/employees/{id}/deactivate"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .call(Method::GET, "/api/v1/auth/current-user", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejected_vendor_loses_portal_access() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (vendor_id, vendor_token) = app.approved_vendor(&admin, "ops@lapsed.test").await;

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/dashboard_stats",
            None,
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/vendors/{vendor_id}/reject"),
            Some(json!({ "rejection_reason": "Failed audit" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/vendor-dashboard/dashboard_stats",
            None,
            Some(&vendor_token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
