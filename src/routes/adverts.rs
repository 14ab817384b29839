use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::adverts::{AdvertList, CreateAdvertRequest, UpdateAdvertRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Advertisement,
    response::ApiResponse,
    services::advert_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_adverts).post(create_advert))
        .route("/{id}", put(update_advert))
        .route("/{id}", delete(delete_advert))
}

#[utoipa::path(
    get,
    path = "/api/adverts",
    responses(
        (status = 200, description = "Active advertisements", body = ApiResponse<AdvertList>)
    ),
    tag = "Adverts"
)]
pub async fn list_adverts(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<AdvertList>>> {
    let resp = advert_service::list_adverts(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/adverts",
    request_body = CreateAdvertRequest,
    responses(
        (status = 200, description = "Advertisement created", body = ApiResponse<Advertisement>)
    ),
    tag = "Adverts"
)]
pub async fn create_advert(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateAdvertRequest>,
) -> AppResult<Json<ApiResponse<Advertisement>>> {
    let resp = advert_service::create_advert(&state.pool, &auth, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/adverts/{id}",
    params(
        ("id" = Uuid, Path, description = "Advertisement ID")
    ),
    request_body = UpdateAdvertRequest,
    responses(
        (status = 200, description = "Updated", body = ApiResponse<Advertisement>)
    ),
    tag = "Adverts"
)]
pub async fn update_advert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdvertRequest>,
) -> AppResult<Json<ApiResponse<Advertisement>>> {
    let resp = advert_service::update_advert(&state.pool, &auth, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/adverts/{id}",
    params(
        ("id" = Uuid, Path, description = "Advertisement ID")
    ),
    responses(
        (status = 200, description = "Deleted")
    ),
    tag = "Adverts"
)]
pub async fn delete_advert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = advert_service::delete_advert(&state.pool, &auth, id).await?;
    Ok(Json(resp))
}
