use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};

use crate::{
    dto::payments::{CreateSessionRequest, CreateSessionResponse, VerifySessionResponse, WebhookAck},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::{
        payment_service,
        payment_service::CheckoutCompleted,
        plan_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout-session", post(create_session))
        .route("/verify/{session_id}", get(verify_session))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/checkout-session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Checkout session created", body = ApiResponse<CreateSessionResponse>),
        (status = 400, description = "Amount below provider minimum"),
        (status = 404, description = "Plan not found")
    ),
    tag = "Payments"
)]
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateSessionRequest>,
) -> AppResult<Json<ApiResponse<CreateSessionResponse>>> {
    let user = plan_service::current_user(&state.pool, &auth).await?;
    let resp = payment_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/verify/{session_id}",
    params(
        ("session_id" = String, Path, description = "Provider checkout session id")
    ),
    responses(
        (status = 200, description = "Session state, reconciled when paid", body = ApiResponse<VerifySessionResponse>)
    ),
    tag = "Payments"
)]
pub async fn verify_session(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(session_id): Path<String>,
) -> AppResult<Json<ApiResponse<VerifySessionResponse>>> {
    let resp = payment_service::verify_session(&state, &session_id).await?;
    Ok(Json(resp))
}

/// Provider webhook. Once the signature checks out we always acknowledge with
/// 200, whatever happens during reconciliation; the provider retries on any
/// other status and the insert is idempotent anyway.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw provider event payload; verified against the Stripe-Signature header"),
    responses(
        (status = 200, description = "Event received", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Signature mismatch")
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;

    let event = state.stripe.verify_webhook(&body, signature)?;

    if event.event_type == "checkout.session.completed" {
        match CheckoutCompleted::from_session(&event.data.object) {
            Ok(completed) => {
                if let Err(err) = payment_service::reconcile(&state.pool, &completed).await {
                    tracing::error!(provider_id = %completed.provider_id, error = %err, "webhook reconciliation failed");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "webhook session missing metadata");
            }
        }
    } else {
        tracing::debug!(event_type = %event.event_type, "ignoring webhook event");
    }

    Ok(Json(ApiResponse::success(
        "Received",
        WebhookAck { received: true },
        None,
    )))
}
