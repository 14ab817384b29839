use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::plans::{CreatePlanRequest, PlanList, UpdatePlanRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Plan,
    response::ApiResponse,
    services::plan_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/{id}", put(update_plan))
        .route("/{id}", delete(delete_plan))
}

#[utoipa::path(
    get,
    path = "/api/plans",
    responses(
        (status = 200, description = "Plan catalog", body = ApiResponse<PlanList>)
    ),
    tag = "Plans"
)]
pub async fn list_plans(State(state): State<AppState>) -> AppResult<Json<ApiResponse<PlanList>>> {
    let resp = plan_service::list_plans(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/plans",
    request_body = CreatePlanRequest,
    responses(
        (status = 200, description = "Plan created", body = ApiResponse<Plan>),
        (status = 409, description = "Plan name already exists")
    ),
    tag = "Plans"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePlanRequest>,
) -> AppResult<Json<ApiResponse<Plan>>> {
    let resp = plan_service::create_plan(&state.pool, &auth, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/plans/{id}",
    params(
        ("id" = Uuid, Path, description = "Plan ID")
    ),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Plan updated", body = ApiResponse<Plan>)
    ),
    tag = "Plans"
)]
pub async fn update_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> AppResult<Json<ApiResponse<Plan>>> {
    let resp = plan_service::update_plan(&state.pool, &auth, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/plans/{id}",
    params(
        ("id" = Uuid, Path, description = "Plan ID")
    ),
    responses(
        (status = 200, description = "Plan deleted")
    ),
    tag = "Plans"
)]
pub async fn delete_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = plan_service::delete_plan(&state.pool, &auth, id).await?;
    Ok(Json(resp))
}
