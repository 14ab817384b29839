use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::plans::{CreatePlanRequest, PlanList, UpdatePlanRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PLAN_FREE, Plan, User},
    response::{ApiResponse, Meta},
};

/// A paid plan has lapsed when its expiry is strictly in the past.
pub fn has_lapsed(user: &User, now: DateTime<Utc>) -> bool {
    user.plan != PLAN_FREE && user.plan_expiry.is_some_and(|expiry| expiry < now)
}

/// Downgrade a lapsed paid plan to Free before any authorization check runs.
/// A persist failure must not deny the request: the in-memory downgrade is
/// applied either way and the storage error is only logged.
pub async fn refresh_plan(pool: &DbPool, mut user: User) -> User {
    if !has_lapsed(&user, Utc::now()) {
        return user;
    }

    user.plan = PLAN_FREE.to_string();
    user.plan_expiry = None;

    let persisted = sqlx::query("UPDATE users SET plan = $1, plan_expiry = NULL WHERE id = $2")
        .bind(PLAN_FREE)
        .bind(user.id)
        .execute(pool)
        .await;

    if let Err(err) = persisted {
        tracing::warn!(user_id = %user.id, error = %err, "plan downgrade persist failed, continuing in-memory");
    } else {
        tracing::info!(user_id = %user.id, "plan lapsed, downgraded to Free");
    }

    user
}

/// Load the authenticated user and run the lifecycle check. Every handler
/// that gates on plan tier or quota goes through here first.
pub async fn current_user(pool: &DbPool, auth: &AuthUser) -> AppResult<User> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(pool)
        .await?;
    let user = user.ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;
    Ok(refresh_plan(pool, user).await)
}

pub fn ensure_premium(user: &User) -> AppResult<()> {
    if user.is_premium() {
        Ok(())
    } else {
        Err(AppError::PlanRequired)
    }
}

pub async fn list_plans(pool: &DbPool) -> AppResult<ApiResponse<PlanList>> {
    let items: Vec<Plan> = sqlx::query_as("SELECT * FROM plans ORDER BY price ASC")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success("Plans", PlanList { items }, None))
}

pub async fn create_plan(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreatePlanRequest,
) -> AppResult<ApiResponse<Plan>> {
    ensure_admin(user)?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM plans WHERE name = $1")
        .bind(payload.name.as_str())
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Plan name already exists".into()));
    }

    let plan: Plan = sqlx::query_as(
        r#"
        INSERT INTO plans (id, name, price, description, features)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.price)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.features.unwrap_or_default())
    .fetch_one(pool)
    .await?;

    audit::record(
        pool,
        Some(user.user_id),
        "plan_create",
        Some("plans"),
        Some(serde_json::json!({ "plan_id": plan.id, "name": plan.name })),
    )
    .await;

    Ok(ApiResponse::success("Plan created", plan, Some(Meta::empty())))
}

pub async fn update_plan(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePlanRequest,
) -> AppResult<ApiResponse<Plan>> {
    ensure_admin(user)?;

    let existing: Option<Plan> = sqlx::query_as("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(new_name) = payload.name.as_ref().filter(|n| **n != existing.name) {
        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM plans WHERE name = $1")
            .bind(new_name.as_str())
            .fetch_optional(pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Plan name already exists".into()));
        }
    }

    let name = payload.name.unwrap_or(existing.name);
    let price = payload.price.unwrap_or(existing.price);
    let description = payload.description.unwrap_or(existing.description);
    let features = payload.features.unwrap_or(existing.features);

    let plan: Plan = sqlx::query_as(
        r#"
        UPDATE plans
        SET name = $2, price = $3, description = $4, features = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(description)
    .bind(features)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Plan updated", plan, Some(Meta::empty())))
}

pub async fn delete_plan(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    // Subscriptions keep their denormalized plan_name; plan_id is set NULL
    // by the FK, so history stays intact.
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        pool,
        Some(user.user_id),
        "plan_delete",
        Some("plans"),
        Some(serde_json::json!({ "plan_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_with_plan(plan: &str, expiry: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "hash".into(),
            role: "user".into(),
            plan: plan.into(),
            plan_expiry: expiry,
            product_count: 0,
            otp: None,
            otp_expires: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expired_monthly_plan_has_lapsed() {
        let now = Utc::now();
        let user = user_with_plan("Monthly", Some(now - Duration::days(1)));
        assert!(has_lapsed(&user, now));
    }

    #[test]
    fn active_yearly_plan_has_not_lapsed() {
        let now = Utc::now();
        let user = user_with_plan("Yearly", Some(now + Duration::days(100)));
        assert!(!has_lapsed(&user, now));
    }

    #[test]
    fn free_plan_never_lapses() {
        let now = Utc::now();
        let user = user_with_plan("Free", None);
        assert!(!has_lapsed(&user, now));
    }

    #[test]
    fn paid_plan_without_expiry_does_not_lapse() {
        let now = Utc::now();
        let user = user_with_plan("Monthly", None);
        assert!(!has_lapsed(&user, now));
    }

    #[test]
    fn premium_gate_follows_plan_name() {
        let monthly = user_with_plan("Monthly", Some(Utc::now()));
        let free = user_with_plan("Free", None);
        assert!(ensure_premium(&monthly).is_ok());
        assert!(ensure_premium(&free).is_err());
    }
}
