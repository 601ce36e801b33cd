//! Hosted checkout gateway client (Razorpay-compatible REST API).

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderRequest {
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub payment_capture: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the checkout widget.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, ServiceError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, ServiceError>;

    /// Checks the checkout callback signature for `order_id|payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Payment gateway returned {}: {}",
                status, body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Invalid gateway response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    #[instrument(skip(self))]
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Payment gateway unreachable: {}", e)))?;
        let order: GatewayOrder = Self::read_json(response).await?;
        debug!(order_id = %order.id, "gateway order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, ServiceError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Payment gateway unreachable: {}", e)))?;
        Self::read_json(response).await
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_checkout_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

/// Hex HMAC-SHA256 of `order_id|payment_id`.
pub fn checkout_signature(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_checkout_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    match checkout_signature(secret, order_id, payment_id) {
        Some(expected) => constant_time_eq(&expected, signature),
        None => false,
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn signature_round_trip() {
        let sig = checkout_signature("secret", "order_1", "pay_1").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify_checkout_signature("secret", "order_1", "pay_1", &sig));
        assert!(!verify_checkout_signature("secret", "order_1", "pay_2", &sig));
        assert!(!verify_checkout_signature("other", "order_1", "pay_1", &sig));
        assert!(!verify_checkout_signature("secret", "order_1", "pay_1", "abc"));
    }

    #[tokio::test]
    async fn create_order_posts_minor_units() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_abc",
                "amount": 123000,
                "currency": "INR",
                "receipt": "invoice_INV-1",
                "status": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RazorpayClient::new(server.uri(), "key", "secret").unwrap();
        let order = client
            .create_order(CreateOrderRequest {
                amount: 123000,
                currency: "INR".into(),
                receipt: "invoice_INV-1".into(),
                payment_capture: 1,
            })
            .await
            .unwrap();
        assert_eq!(order.id, "order_abc");
        assert_eq!(order.amount, 123000);
    }

    #[tokio::test]
    async fn gateway_errors_map_to_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/pay_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = RazorpayClient::new(server.uri(), "key", "secret").unwrap();
        let err = client.fetch_payment("pay_missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}
