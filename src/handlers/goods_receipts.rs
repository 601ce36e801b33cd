use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{created_response, success_response},
    models::goods_receipt_item,
    services::receiving::{
        CreateGoodsReceipt, CreateReceiptItem, GoodsReceiptFilter, GoodsReceiptView,
        ReceiptItemFilter,
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/goods-receipts",
    params(GoodsReceiptFilter),
    responses((status = 200, description = "Receipts, newest first", body = [GoodsReceiptView])),
    tag = "goods-receipts",
    security(("bearer_auth" = []))
)]
pub async fn list_receipts(
    State(state): State<AppState>,
    Query(filter): Query<GoodsReceiptFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.receiving.list(filter).await?))
}

/// Record a delivery. Good and partial deliveries add stock for every product on the order.
#[utoipa::path(
    post,
    path = "/api/v1/goods-receipts",
    request_body = CreateGoodsReceipt,
    responses(
        (status = 201, description = "Receipt recorded", body = GoodsReceiptView),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "goods-receipts",
    security(("bearer_auth" = []))
)]
pub async fn create_receipt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateGoodsReceipt>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.receiving.create(user.user_id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/goods-receipts/{id}",
    params(("id" = Uuid, Path, description = "Goods receipt ID")),
    responses(
        (status = 200, description = "Receipt", body = GoodsReceiptView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "goods-receipts",
    security(("bearer_auth" = []))
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.receiving.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/goods-receipt-items",
    params(ReceiptItemFilter),
    responses((status = 200, description = "Received lines", body = [goods_receipt_item::Model])),
    tag = "goods-receipts",
    security(("bearer_auth" = []))
)]
pub async fn list_receipt_items(
    State(state): State<AppState>,
    Query(filter): Query<ReceiptItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.receiving.list_items(filter).await?,
    ))
}

/// Record a received line; the accepted quantity is added to stock
#[utoipa::path(
    post,
    path = "/api/v1/goods-receipt-items",
    request_body = CreateReceiptItem,
    responses((status = 201, description = "Line recorded", body = goods_receipt_item::Model)),
    tag = "goods-receipts",
    security(("bearer_auth" = []))
)]
pub async fn create_receipt_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateReceiptItem>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.receiving.create_item(payload).await?,
    ))
}

pub fn goods_receipt_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/goods-receipts", get(list_receipts))
        .route("/goods-receipts/:id", get(get_receipt))
        .route("/goods-receipt-items", get(list_receipt_items))
        .with_permission(perm::GOODS_RECEIPTS_READ);

    let create = Router::new()
        .route("/goods-receipts", axum::routing::post(create_receipt))
        .route("/goods-receipt-items", axum::routing::post(create_receipt_item))
        .with_permission(perm::GOODS_RECEIPTS_CREATE);

    read.merge(create)
}
