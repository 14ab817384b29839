use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::recipes::{RecipeSuggestion, SaveRecipeRequest, SavedRecipeList},
    error::{AppError, AppResult},
    models::{CATEGORY_FOOD, SavedRecipe, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

const NEAR_EXPIRY_DAYS: i64 = 7;
const MAX_INGREDIENTS: i64 = 10;

/// Suggest a recipe from the user's food items expiring within the next week.
/// Purely presentational; nothing is persisted unless the user saves it.
pub async fn suggest(state: &AppState, user: &User) -> AppResult<ApiResponse<RecipeSuggestion>> {
    let now = Utc::now();
    let cutoff = now + Duration::days(NEAR_EXPIRY_DAYS);

    let names: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT name FROM products
        WHERE user_id = $1
          AND category = $2
          AND expiry_date >= $3
          AND expiry_date <= $4
        ORDER BY expiry_date ASC
        LIMIT $5
        "#,
    )
    .bind(user.id)
    .bind(CATEGORY_FOOD)
    .bind(now)
    .bind(cutoff)
    .bind(MAX_INGREDIENTS)
    .fetch_all(&state.pool)
    .await?;

    let ingredients: Vec<String> = names.into_iter().map(|(n,)| n).collect();
    if ingredients.is_empty() {
        return Err(AppError::BadRequest(
            "No food items expiring within the next 7 days".into(),
        ));
    }

    let prompt = format!(
        "Suggest one simple recipe that uses up these ingredients before they expire: {}. \
         Keep it under 200 words and format it as a short title, an ingredient list and numbered steps.",
        ingredients.join(", ")
    );
    let recipe_text = state.ai.generate_text(&prompt).await?;

    Ok(ApiResponse::success(
        "Recipe suggestion",
        RecipeSuggestion {
            recipe_text,
            ingredients,
        },
        None,
    ))
}

pub async fn save_recipe(
    pool: &DbPool,
    user: &User,
    payload: SaveRecipeRequest,
) -> AppResult<ApiResponse<SavedRecipe>> {
    if payload.product_name.trim().is_empty() || payload.recipe_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "product_name and recipe_text are required".into(),
        ));
    }

    // The product reference is weak on purpose; the snapshot survives the
    // product being deleted later.
    let recipe: SavedRecipe = sqlx::query_as(
        r#"
        INSERT INTO saved_recipes (id, user_id, product_id, product_name, recipe_text, expiry_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(payload.product_id)
    .bind(payload.product_name)
    .bind(payload.recipe_text)
    .bind(payload.expiry_date)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Recipe saved", recipe, Some(Meta::empty())))
}

pub async fn list_saved(pool: &DbPool, user: &User) -> AppResult<ApiResponse<SavedRecipeList>> {
    let items: Vec<SavedRecipe> =
        sqlx::query_as("SELECT * FROM saved_recipes WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(pool)
            .await?;
    Ok(ApiResponse::success("Saved recipes", SavedRecipeList { items }, None))
}

pub async fn delete_saved(
    pool: &DbPool,
    user: &User,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM saved_recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
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
