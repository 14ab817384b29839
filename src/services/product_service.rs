use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult, FieldError},
    models::{CATEGORY_FOOD, CATEGORY_NON_FOOD, FREE_PRODUCT_LIMIT, PLAN_FREE, Product, User},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

fn validate_category(category: &str) -> AppResult<()> {
    if category == CATEGORY_FOOD || category == CATEGORY_NON_FOOD {
        Ok(())
    } else {
        Err(AppError::Validation(vec![FieldError {
            field: "category".into(),
            message: format!("category must be '{CATEGORY_FOOD}' or '{CATEGORY_NON_FOOD}'"),
            value: Some(serde_json::json!(category)),
        }]))
    }
}

fn validate_create(payload: &CreateProductRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    if payload.name.trim().is_empty() {
        errors.push(FieldError {
            field: "name".into(),
            message: "name is required".into(),
            value: None,
        });
    }
    if payload.price.is_some_and(|p| p < 0.0) {
        errors.push(FieldError {
            field: "price".into(),
            message: "price must not be negative".into(),
            value: Some(serde_json::json!(payload.price)),
        });
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    validate_category(&payload.category)
}

/// Remaining Free-tier slots, never negative.
pub fn remaining_quota(user: &User) -> i64 {
    (FREE_PRODUCT_LIMIT - user.product_count as i64).max(0)
}

fn check_quota(user: &User) -> AppResult<()> {
    if user.plan == PLAN_FREE && user.product_count as i64 >= FREE_PRODUCT_LIMIT {
        return Err(AppError::QuotaExceeded {
            remaining: remaining_quota(user),
        });
    }
    Ok(())
}

pub async fn list_products(
    state: &AppState,
    user: &User,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let sort_col = query.sort_by.unwrap_or(ProductSortBy::ExpiryDate).as_sql();
    let sort_dir = query.sort_order.unwrap_or(SortOrder::Asc).as_sql();

    let search = query.q.filter(|s| !s.is_empty());
    let category = query.category.filter(|s| !s.is_empty());

    let sql = format!(
        r#"
        SELECT * FROM products
        WHERE user_id = $1
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR category = $3)
        ORDER BY {sort_col} {sort_dir}
        LIMIT $4 OFFSET $5
        "#
    );

    let items: Vec<Product> = sqlx::query_as(&sql)
        .bind(user.id)
        .bind(search.as_deref())
        .bind(category.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(*) FROM products
        WHERE user_id = $1
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR category = $3)
        "#,
    )
    .bind(user.id)
    .bind(search.as_deref())
    .bind(category.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::page(page, limit, total.0);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    user: &User,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?;
    match product {
        Some(p) => Ok(ApiResponse::success("Product", p, None)),
        None => Err(AppError::NotFound),
    }
}

/// Create a product for the (already plan-refreshed) user. The denormalized
/// product_count on the user row is the quota authority and is incremented in
/// the same transaction as the insert.
pub async fn create_product(
    state: &AppState,
    user: &User,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_create(&payload)?;
    check_quota(user)?;

    let mut tx = state.pool.begin().await?;

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (id, user_id, name, category, weight, price, image_url, expiry_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(payload.name.trim())
    .bind(payload.category)
    .bind(payload.weight)
    .bind(payload.price)
    .bind(payload.image_url)
    .bind(payload.expiry_date)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET product_count = product_count + 1 WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success("Product created", product, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &User,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(category) = payload.category.as_deref() {
        validate_category(category)?;
    }
    if payload.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let name = payload.name.unwrap_or(existing.name);
    let category = payload.category.unwrap_or(existing.category);
    let weight = payload.weight.or(existing.weight);
    let price = payload.price.or(existing.price);
    let image_url = payload.image_url.clone().or(existing.image_url.clone());
    let expiry_date = payload.expiry_date.unwrap_or(existing.expiry_date);

    // A replaced image leaves a stale file behind; clean it up.
    if payload.image_url.is_some() && existing.image_url != payload.image_url {
        if let Some(old) = existing.image_url {
            remove_upload(state, &old).await;
        }
    }

    let product: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET name = $2, category = $3, weight = $4, price = $5, image_url = $6, expiry_date = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category)
    .bind(weight)
    .bind(price)
    .bind(image_url)
    .bind(expiry_date)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &User,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut tx = state.pool.begin().await?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // Floored at zero in case the counter ever drifted low.
    sqlx::query("UPDATE users SET product_count = GREATEST(product_count - 1, 0) WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Some(image_url) = existing.image_url {
        remove_upload(state, &image_url).await;
    }

    audit::record(
        &state.pool,
        Some(user.id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Best-effort removal of a locally stored upload. Remote URLs are ignored.
pub async fn remove_upload(state: &AppState, image_url: &str) {
    let upload_dir = &state.config.upload_dir;
    let Some(file_name) = image_url.strip_prefix(&format!("/{upload_dir}/")) else {
        return;
    };
    if file_name.contains("..") || file_name.contains('/') {
        return;
    }
    let path = std::path::Path::new(upload_dir).join(file_name);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::debug!(path = %path.display(), error = %err, "stale upload removal failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_on_plan(plan: &str, product_count: i32) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "hash".into(),
            role: "user".into(),
            plan: plan.into(),
            plan_expiry: None,
            product_count,
            otp: None,
            otp_expires: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn free_user_at_limit_is_rejected() {
        let user = user_on_plan("Free", 5);
        match check_quota(&user) {
            Err(AppError::QuotaExceeded { remaining }) => assert_eq!(remaining, 0),
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[test]
    fn free_user_below_limit_is_admitted() {
        let user = user_on_plan("Free", 4);
        assert!(check_quota(&user).is_ok());
    }

    #[test]
    fn premium_user_has_no_quota() {
        let user = user_on_plan("Yearly", 50);
        assert!(check_quota(&user).is_ok());
    }

    #[test]
    fn remaining_quota_never_goes_negative() {
        let user = user_on_plan("Free", 9);
        assert_eq!(remaining_quota(&user), 0);
    }

    #[test]
    fn category_must_be_known() {
        assert!(validate_category("Food").is_ok());
        assert!(validate_category("Non-Food").is_ok());
        assert!(validate_category("Gadgets").is_err());
    }
}
