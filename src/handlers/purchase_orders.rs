use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{created_response, no_content_response, success_response},
    models::purchase_order_item,
    services::{
        ordering::{
            CreateOrderItem, CreatePurchaseOrder, OrderItemFilter, PurchaseOrderDetail,
            PurchaseOrderFilter, StatusUpdate, StatusUpdated, UpdateOrderItem,
            UpdatePurchaseOrder,
        },
        receiving::{GoodsReceiptView, ReceiptInput},
    },
    AppState,
};

// Purchase orders

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PurchaseOrderFilter),
    responses((status = 200, description = "Purchase orders, newest first", body = [PurchaseOrderDetail])),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.ordering.list(filter).await?))
}

/// Orders assigned to the caller
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/assigned",
    responses((status = 200, description = "Assigned purchase orders", body = [PurchaseOrderDetail])),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn assigned_purchase_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.ordering.assigned(&user).await?))
}

/// Create a purchase order; a blank number is generated
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrder,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePurchaseOrder>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.ordering.create(&user, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched", body = PurchaseOrderDetail),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.ordering.get(po_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}",
    request_body = UpdatePurchaseOrder,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrder>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.ordering.update(po_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 400, description = "Order has goods receipts", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.ordering.delete(po_id).await?;
    Ok(no_content_response())
}

/// Record a delivery against the order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/goods-receipt",
    request_body = ReceiptInput,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 201, description = "Goods receipt recorded", body = GoodsReceiptView),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(po_id): Path<Uuid>,
    Json(payload): Json<ReceiptInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .receiving
            .receive_for_order(po_id, user.user_id, payload)
            .await?,
    ))
}

/// Move the order through its fulfilment states (administrators and the assignee)
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/update-status",
    request_body = StatusUpdate,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Status updated", body = StatusUpdated),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not assigned to this order", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders",
    security(("bearer_auth" = []))
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(po_id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .ordering
            .update_status(&user, po_id, payload)
            .await?,
    ))
}

// Order lines

#[utoipa::path(
    get,
    path = "/api/v1/purchase-order-items",
    params(OrderItemFilter),
    responses((status = 200, description = "Order lines", body = [purchase_order_item::Model])),
    tag = "purchase-order-items",
    security(("bearer_auth" = []))
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    Query(filter): Query<OrderItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.ordering.list_items(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-order-items/{id}",
    params(("id" = Uuid, Path, description = "Order line ID")),
    responses((status = 200, description = "Order line", body = purchase_order_item::Model)),
    tag = "purchase-order-items",
    security(("bearer_auth" = []))
)]
pub async fn get_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.ordering.get_item(id).await?))
}

/// Add a line; the order totals are recomputed
#[utoipa::path(
    post,
    path = "/api/v1/purchase-order-items",
    request_body = CreateOrderItem,
    responses((status = 201, description = "Order line created", body = purchase_order_item::Model)),
    tag = "purchase-order-items",
    security(("bearer_auth" = []))
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderItem>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.ordering.create_item(payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-order-items/{id}",
    request_body = UpdateOrderItem,
    params(("id" = Uuid, Path, description = "Order line ID")),
    responses((status = 200, description = "Order line updated", body = purchase_order_item::Model)),
    tag = "purchase-order-items",
    security(("bearer_auth" = []))
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItem>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.ordering.update_item(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-order-items/{id}",
    params(("id" = Uuid, Path, description = "Order line ID")),
    responses((status = 204, description = "Order line deleted")),
    tag = "purchase-order-items",
    security(("bearer_auth" = []))
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.ordering.delete_item(id).await?;
    Ok(no_content_response())
}

pub fn purchase_order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/purchase-orders", get(list_purchase_orders))
        .route("/purchase-orders/assigned", get(assigned_purchase_orders))
        .route("/purchase-orders/:id", get(get_purchase_order))
        .route("/purchase-order-items", get(list_order_items))
        .route("/purchase-order-items/:id", get(get_order_item))
        .with_permission(perm::PURCHASE_ORDERS_READ);

    let manage = Router::new()
        .route("/purchase-orders", post(create_purchase_order))
        .route(
            "/purchase-orders/:id",
            axum::routing::put(update_purchase_order)
                .patch(update_purchase_order)
                .delete(delete_purchase_order),
        )
        .route("/purchase-order-items", post(create_order_item))
        .route(
            "/purchase-order-items/:id",
            axum::routing::put(update_order_item)
                .patch(update_order_item)
                .delete(delete_order_item),
        )
        .with_permission(perm::PURCHASE_ORDERS_MANAGE);

    let status = Router::new()
        .route(
            "/purchase-orders/:id/update-status",
            post(update_purchase_order_status),
        )
        .with_permission(perm::PURCHASE_ORDERS_UPDATE_STATUS);

    let receive = Router::new()
        .route(
            "/purchase-orders/:id/goods-receipt",
            post(receive_purchase_order),
        )
        .with_permission(perm::GOODS_RECEIPTS_CREATE);

    read.merge(manage).merge(status).merge(receive)
}
