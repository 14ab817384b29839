use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::capture::{ProductDraft, ScanImageRequest, SpoilageEstimate},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::capture_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/label", post(scan_label))
        .route("/condition", post(estimate_condition))
        .route("/barcode/{code}", get(barcode_lookup))
}

#[utoipa::path(
    post,
    path = "/api/capture/label",
    request_body = ScanImageRequest,
    responses(
        (status = 200, description = "Best-effort product draft", body = ApiResponse<ProductDraft>)
    ),
    tag = "Capture"
)]
pub async fn scan_label(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<ScanImageRequest>,
) -> AppResult<Json<ApiResponse<ProductDraft>>> {
    let resp = capture_service::scan_label(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/capture/condition",
    request_body = ScanImageRequest,
    responses(
        (status = 200, description = "Spoilage estimate", body = ApiResponse<SpoilageEstimate>)
    ),
    tag = "Capture"
)]
pub async fn estimate_condition(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<ScanImageRequest>,
) -> AppResult<Json<ApiResponse<SpoilageEstimate>>> {
    let resp = capture_service::estimate_condition(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/capture/barcode/{code}",
    params(
        ("code" = String, Path, description = "EAN/UPC barcode digits")
    ),
    responses(
        (status = 200, description = "Product draft from barcode database", body = ApiResponse<ProductDraft>),
        (status = 404, description = "Barcode not found")
    ),
    tag = "Capture"
)]
pub async fn barcode_lookup(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<ProductDraft>>> {
    let resp = capture_service::barcode_lookup(&state, &code).await?;
    Ok(Json(resp))
}
