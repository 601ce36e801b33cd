use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `{"message": ...}` with a 200 status.
pub fn message_response(message: impl Into<String>) -> Response {
    success_response(json!({ "message": message.into() }))
}

/// Body of endpoints that only report an outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn message_response_wraps_text() {
        let response = message_response("Logout successful");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Logout successful");
    }

    #[test]
    fn no_content_has_no_body_status() {
        assert_eq!(no_content_response().status(), StatusCode::NO_CONTENT);
        assert_eq!(created_response(json!({})).status(), StatusCode::CREATED);
    }
}
