#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use procurement_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        accounts::create_superuser,
        mailer::{LogMailer, Mailer},
        payment_gateway::{PaymentGateway, RazorpayClient},
    },
    AppState,
};

pub const ADMIN_PASSWORD: &str = "admin-password-1";
pub const GATEWAY_KEY_ID: &str = "rzp_test_key";
pub const GATEWAY_SECRET: &str = "rzp_test_secret";

const TEST_JWT_SECRET: &str =
    "integration-secret-0123456789-abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJKLMNOP";

/// Application wired against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_gateway_url("http://127.0.0.1:9").await
    }

    /// Points the payment gateway client at `gateway_url`, usually a wiremock server.
    pub async fn with_gateway_url(gateway_url: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        cfg.upload_dir = dir.path().join("uploads").display().to_string();
        cfg.payment_gateway_base_url = gateway_url.to_string();
        cfg.payment_gateway_key_id = GATEWAY_KEY_ID.to_string();
        cfg.payment_gateway_key_secret = GATEWAY_SECRET.to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx, Vec::new()));

        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
        ));
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(
            RazorpayClient::new(
                cfg.payment_gateway_base_url.clone(),
                cfg.payment_gateway_key_id.clone(),
                cfg.payment_gateway_key_secret.clone(),
            )
            .expect("gateway client"),
        );

        let services =
            AppServices::new(db_arc.clone(), event_sender, auth.clone(), mailer, gateway, &cfg);
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
            auth,
        };
        let router = procurement_api::build_app(state.clone());

        Self {
            router,
            state,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends the request and returns the status with the decoded JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": username, "password": password })),
            None,
        )
        .await
    }

    /// Creates the administrator account and returns its access token.
    pub async fn admin_token(&self) -> String {
        create_superuser(&*self.state.db, "admin", "admin@example.com", ADMIN_PASSWORD)
            .await
            .expect("create administrator");
        let (status, body) = self.login("admin", ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        token_of(&body)
    }

    /// Creates a staff account and signs in with its temporary password.
    /// Returns `(user_id, token)`.
    pub async fn employee(&self, admin: &str, username: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/employees",
                Some(json!({
                    "username": username,
                    "email": format!("{username}@corp.test"),
                    "first_name": "Ravi",
                    "department": "Stores",
                    "position": "Clerk"
                })),
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "employee creation failed: {body}");
        let id = body["id"].as_str().expect("employee id").to_string();
        let temporary = body["temporary_password"]
            .as_str()
            .expect("temporary password")
            .to_string();

        let (status, body) = self.login(username, &temporary).await;
        assert_eq!(status, StatusCode::OK, "employee login failed: {body}");
        (id, token_of(&body))
    }

    /// Registers a vendor through the public form, approves it and signs in
    /// as its user. Returns `(vendor_id, vendor_token)`.
    pub async fn approved_vendor(&self, admin: &str, email: &str) -> (String, String) {
        let password = "vendor-password-1";
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/vendor/register",
                Some(json!({
                    "company_name": format!("{email} Supplies"),
                    "contact_person": "Priya Nair",
                    "email": email,
                    "phone": "+91 98450 00000",
                    "password": password,
                    "city": "Bengaluru"
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
        let vendor_id = body["vendor"]["id"].as_str().expect("vendor id").to_string();
        let username = body["vendor"]["username"]
            .as_str()
            .expect("vendor username")
            .to_string();

        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/vendors/{vendor_id}/approve"),
                None,
                Some(admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approval failed: {body}");

        let (status, body) = self.login(&username, password).await;
        assert_eq!(status, StatusCode::OK, "vendor login failed: {body}");
        (vendor_id, token_of(&body))
    }

    /// Runs request, RFQ and quotation through to an approved purchase order
    /// worth 1230 (10 x 100, 18% tax, 50 shipping).
    pub async fn ordered(&self) -> Ordered {
        let admin = self.admin_token().await;
        let (vendor_id, vendor_token) = self.approved_vendor(&admin, "orders@vendor.test").await;

        let (status, request) = self
            .call(
                Method::POST,
                "/api/v1/purchase-requests",
                Some(json!({
                    "item_name": "Safety gloves",
                    "quantity": 10,
                    "department": "Warehouse",
                    "justification": "Quarterly PPE"
                })),
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{request}");
        let request_id = request["id"].as_str().expect("request id").to_string();

        let (status, _) = self
            .call(
                Method::POST,
                &format!("/api/v1/purchase-requests/{request_id}/approve"),
                None,
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, sent) = self
            .call(
                Method::POST,
                &format!("/api/v1/purchase-requests/{request_id}/send-rfq"),
                Some(json!({ "vendor_ids": [vendor_id] })),
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{sent}");
        let rfq_id = sent["rfqs"][0]["id"].as_str().expect("rfq id").to_string();

        let (status, quoted) = self
            .call(
                Method::POST,
                &format!("/api/v1/vendor-dashboard/{rfq_id}/submit_quotation"),
                Some(json!({
                    "unit_price": "100",
                    "quantity": 10,
                    "tax_rate": "18",
                    "shipping_cost": "50",
                    "estimated_delivery_days": 5,
                    "quotation_valid_until": "2031-06-30"
                })),
                Some(&vendor_token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{quoted}");

        let (status, accepted) = self
            .call(
                Method::POST,
                &format!("/api/v1/rfqs/{rfq_id}/accept_quotation"),
                None,
                Some(&admin),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{accepted}");
        let po_id = accepted["po"]["id"].as_str().expect("po id").to_string();

        Ordered {
            admin,
            vendor_id,
            vendor_token,
            po_id,
        }
    }
}

pub struct Ordered {
    pub admin: String,
    pub vendor_id: String,
    pub vendor_token: String,
    pub po_id: String,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

pub fn token_of(login: &Value) -> String {
    login["token"].as_str().expect("token in login response").to_string()
}

/// Decimals serialize as strings; accept plain numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
