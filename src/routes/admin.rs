use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{DashboardStats, PromotionRequest, PromotionResponse, UserList},
        reports::{MonthQuery, MonthlyReport},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::ApiResponse,
    routes::params::Pagination,
    services::{admin_service, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/report", get(monthly_report))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/promotions", post(send_promotions))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard stats", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Admin role required")
    ),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = admin_service::dashboard(&state, &auth).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/report",
    params(
        ("month" = Option<u32>, Query, description = "1-12, defaults to current month"),
        ("year" = Option<i32>, Query, description = "Defaults to current year"),
    ),
    responses(
        (status = 200, description = "Monthly waste and revenue", body = ApiResponse<MonthlyReport>)
    ),
    tag = "Admin"
)]
pub async fn monthly_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ApiResponse<MonthlyReport>>> {
    ensure_admin(&auth)?;
    let resp = report_service::monthly_report(&state.pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "User list", body = ApiResponse<UserList>)
    ),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &auth, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User and owned records deleted"),
        (status = 403, description = "Superadmin role required")
    ),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_user(&state, &auth, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/promotions",
    request_body = PromotionRequest,
    responses(
        (status = 200, description = "Broadcast queued", body = ApiResponse<PromotionResponse>)
    ),
    tag = "Admin"
)]
pub async fn send_promotions(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PromotionRequest>,
) -> AppResult<Json<ApiResponse<PromotionResponse>>> {
    let resp = admin_service::send_promotions(&state, &auth, payload).await?;
    Ok(Json(resp))
}
