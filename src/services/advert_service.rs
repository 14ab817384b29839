use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::adverts::{AdvertList, CreateAdvertRequest, UpdateAdvertRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Advertisement,
    response::{ApiResponse, Meta},
};

pub async fn list_adverts(pool: &DbPool) -> AppResult<ApiResponse<AdvertList>> {
    let items: Vec<Advertisement> =
        sqlx::query_as("SELECT * FROM advertisements ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(ApiResponse::success("Advertisements", AdvertList { items }, None))
}

pub async fn create_advert(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateAdvertRequest,
) -> AppResult<ApiResponse<Advertisement>> {
    ensure_admin(user)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }

    let advert: Advertisement = sqlx::query_as(
        r#"
        INSERT INTO advertisements (id, title, description, image_url, link)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.title)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.image_url)
    .bind(payload.link)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Advertisement created", advert, Some(Meta::empty())))
}

pub async fn update_advert(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAdvertRequest,
) -> AppResult<ApiResponse<Advertisement>> {
    ensure_admin(user)?;

    let existing: Option<Advertisement> =
        sqlx::query_as("SELECT * FROM advertisements WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    let title = payload.title.unwrap_or(existing.title);
    let description = payload.description.unwrap_or(existing.description);
    let image_url = payload.image_url.or(existing.image_url);
    let link = payload.link.or(existing.link);

    let advert: Advertisement = sqlx::query_as(
        r#"
        UPDATE advertisements
        SET title = $2, description = $3, image_url = $4, link = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(image_url)
    .bind(link)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Updated", advert, Some(Meta::empty())))
}

pub async fn delete_advert(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
