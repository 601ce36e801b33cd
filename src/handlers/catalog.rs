use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::common::{created_response, no_content_response, success_response},
    models::{category, product},
    services::catalog::{CategoryInput, CreateProduct, CreatedProduct, ProductFilter, UpdateProduct},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories by name", body = [category::Model])),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.catalog.list_categories().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = category::Model),
        (status = 400, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.catalog.create_category(payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category", body = category::Model)),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.catalog.get_category(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    request_body = CategoryInput,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category updated", body = category::Model)),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.catalog.update_category(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 204, description = "Category deleted")),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_category(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses((status = 200, description = "Products by code", body = [product::Model])),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.catalog.list_products(filter).await?))
}

/// Create a product; its code is assigned from the `PID` sequence
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = CreatedProduct),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.catalog.create_product(payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.catalog.get_product(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProduct,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product updated", body = product::Model)),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.catalog.update_product(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 204, description = "Product deleted")),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/activate",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product activated", body = product::Model)),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn activate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.catalog.set_product_active(id, true).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product deactivated", body = product::Model)),
    tag = "catalog",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.catalog.set_product_active(id, false).await?,
    ))
}

pub fn catalog_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(get_category))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .with_permission(perm::CATALOG_READ);

    let manage = Router::new()
        .route("/categories", post(create_category))
        .route(
            "/categories/:id",
            axum::routing::put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            axum::routing::put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/products/:id/activate", post(activate_product))
        .route("/products/:id/deactivate", post(deactivate_product))
        .with_permission(perm::CATALOG_MANAGE);

    read.merge(manage)
}
