use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::common::{created_response, success_response},
    services::{
        dashboards::AdminStats,
        employees::{
            CreateEmployee, CreatedEmployee, EmployeeFilter, EmployeeView, PasswordReset,
            UpdateEmployee,
        },
    },
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeMessage {
    pub message: String,
    pub employee: EmployeeView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeDeleted {
    pub message: String,
    pub employee_id: Uuid,
}

/// List employee accounts
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeFilter),
    responses((status = 200, description = "Employees", body = [EmployeeView])),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let employees = state.services.employees.list(filter).await?;
    Ok(success_response(employees))
}

/// Create an employee and email the temporary password to HR
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = CreatedEmployee),
        (status = 400, description = "Invalid or duplicate fields", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployee>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.services.employees.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee", body = EmployeeView),
        (status = 403, description = "Vendor account", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.employees.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    request_body = UpdateEmployee,
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee updated", body = EmployeeMessage),
        (status = 403, description = "Vendor account", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployee>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = state.services.employees.update(id, payload).await?;
    Ok(success_response(EmployeeMessage {
        message: "Employee updated successfully".to_string(),
        employee,
    }))
}

/// Delete an employee, detaching their purchase requests, receipts and orders
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted", body = EmployeeDeleted),
        (status = 403, description = "Vendor account", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let username = state.services.employees.delete(id).await?;
    Ok(success_response(EmployeeDeleted {
        message: format!("Employee {} deleted successfully", username),
        employee_id: id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees/{id}/activate",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Employee activated", body = EmployeeMessage)),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn activate_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = state.services.employees.set_active(id, true).await?;
    Ok(success_response(EmployeeMessage {
        message: "Employee activated successfully".to_string(),
        employee,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Employee deactivated", body = EmployeeMessage)),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = state.services.employees.set_active(id, false).await?;
    Ok(success_response(EmployeeMessage {
        message: "Employee deactivated successfully".to_string(),
        employee,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees/{id}/reset_password",
    params(("id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "New temporary password", body = PasswordReset),
        (status = 403, description = "Vendor account", body = crate::errors::ErrorResponse)
    ),
    tag = "employees",
    security(("bearer_auth" = []))
)]
pub async fn reset_employee_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.employees.reset_password(id).await?))
}

/// Administrator dashboard counters
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Counters", body = AdminStats),
        (status = 403, description = "Not an administrator", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.dashboards.admin_stats().await?))
}

pub fn employee_routes() -> Router<AppState> {
    let employees = Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/:id",
            get(get_employee)
                .put(update_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
        .route("/employees/:id/activate", post(activate_employee))
        .route("/employees/:id/deactivate", post(deactivate_employee))
        .route("/employees/:id/reset_password", post(reset_employee_password))
        .with_permission(perm::EMPLOYEES_MANAGE);

    let dashboard = Router::new()
        .route("/dashboard/stats", get(dashboard_stats))
        .with_permission(perm::DASHBOARD_READ);

    employees.merge(dashboard)
}
