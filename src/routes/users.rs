use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{
        auth::UpdateProfileRequest,
        reports::{MonthQuery, UserWasteReport},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::{auth_service, plan_service, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/waste-report", get(waste_report))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current profile", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Users"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::get_profile(&state.pool, &auth).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>)
    ),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::update_profile(&state.pool, &auth, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/me/waste-report",
    params(
        ("month" = Option<u32>, Query, description = "1-12, defaults to current month"),
        ("year" = Option<i32>, Query, description = "Defaults to current year"),
    ),
    responses(
        (status = 200, description = "Personal waste report", body = ApiResponse<UserWasteReport>),
        (status = 403, description = "Premium plan required")
    ),
    tag = "Users"
)]
pub async fn waste_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ApiResponse<UserWasteReport>>> {
    // Lifecycle check first: a lapsed plan downgrades here and then fails the
    // premium gate in the same request.
    let user = plan_service::current_user(&state.pool, &auth).await?;
    plan_service::ensure_premium(&user)?;
    let resp = report_service::user_waste_report(&state.pool, user.id, query).await?;
    Ok(Json(resp))
}
