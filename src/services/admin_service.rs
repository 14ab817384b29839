use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{DashboardStats, PromotionRequest, PromotionResponse, UserList},
        reports::MonthQuery,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_superadmin},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::report_service,
    state::AppState,
};

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let user_count: (i64,) = sqlx::query_as("SELECT count(*) FROM users")
        .fetch_one(&state.pool)
        .await?;
    let product_count: (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(&state.pool)
        .await?;

    let now = Utc::now();
    let report = report_service::monthly_report(
        &state.pool,
        MonthQuery {
            month: Some(now.month()),
            year: Some(now.year()),
        },
    )
    .await?;
    let report = report
        .data
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("report without data")))?;

    let stats = DashboardStats {
        user_count: user_count.0,
        product_count: product_count.0,
        monthly_waste: report.total_waste,
        monthly_revenue: report.revenue,
    };
    Ok(ApiResponse::success("Dashboard", stats, None))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let items: Vec<User> =
        sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::page(page, limit, total.0);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

/// Cascade delete: products, subscriptions and saved recipes go via FK;
/// uploaded image files are removed best-effort afterwards.
pub async fn delete_user(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_superadmin(admin)?;

    if admin.user_id == id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }

    let image_urls: Vec<(String,)> = sqlx::query_as(
        "SELECT image_url FROM products WHERE user_id = $1 AND image_url IS NOT NULL",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    for (url,) in image_urls {
        crate::services::product_service::remove_upload(state, &url).await;
    }

    audit::record(
        &state.pool,
        Some(admin.user_id),
        "user_delete",
        Some("users"),
        Some(serde_json::json!({ "deleted_user_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Promotional broadcast. The response carries only the intended recipient
/// count; sending happens in a detached task so a slow SMTP relay never
/// holds the request open.
pub async fn send_promotions(
    state: &AppState,
    user: &AuthUser,
    payload: PromotionRequest,
) -> AppResult<ApiResponse<PromotionResponse>> {
    ensure_admin(user)?;
    if payload.subject.trim().is_empty() || payload.body.trim().is_empty() {
        return Err(AppError::BadRequest("subject and body are required".into()));
    }

    let recipients: Vec<(String,)> = sqlx::query_as("SELECT email FROM users ORDER BY created_at")
        .fetch_all(&state.pool)
        .await?;
    let recipients: Vec<String> = recipients.into_iter().map(|(e,)| e).collect();

    let count = state
        .mailer
        .clone()
        .broadcast(recipients, payload.subject, payload.body);

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promotion_broadcast",
        Some("users"),
        Some(serde_json::json!({ "recipients": count })),
    )
    .await;

    Ok(ApiResponse::success(
        "Broadcast started",
        PromotionResponse { recipients: count },
        Some(Meta::empty()),
    ))
}
