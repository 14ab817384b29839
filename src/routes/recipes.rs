use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::recipes::{RecipeSuggestion, SaveRecipeRequest, SavedRecipeList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::SavedRecipe,
    response::ApiResponse,
    services::{plan_service, recipe_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggest", get(suggest))
        .route("/", post(save_recipe).get(list_saved))
        .route("/{id}", delete(delete_saved))
}

#[utoipa::path(
    get,
    path = "/api/recipes/suggest",
    responses(
        (status = 200, description = "Recipe from near-expiry items", body = ApiResponse<RecipeSuggestion>),
        (status = 400, description = "No food items expiring soon")
    ),
    tag = "Recipes"
)]
pub async fn suggest(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<RecipeSuggestion>>> {
    let user = plan_service::current_user(&state.pool, &auth).await?;
    let resp = recipe_service::suggest(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = SaveRecipeRequest,
    responses(
        (status = 200, description = "Recipe saved", body = ApiResponse<SavedRecipe>)
    ),
    tag = "Recipes"
)]
pub async fn save_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SaveRecipeRequest>,
) -> AppResult<Json<ApiResponse<SavedRecipe>>> {
    let user = plan_service::current_user(&state.pool, &auth).await?;
    let resp = recipe_service::save_recipe(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    responses(
        (status = 200, description = "Saved recipes", body = ApiResponse<SavedRecipeList>)
    ),
    tag = "Recipes"
)]
pub async fn list_saved(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<SavedRecipeList>>> {
    let user = plan_service::current_user(&state.pool, &auth).await?;
    let resp = recipe_service::list_saved(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    params(
        ("id" = Uuid, Path, description = "Saved recipe ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not found")
    ),
    tag = "Recipes"
)]
pub async fn delete_saved(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let user = plan_service::current_user(&state.pool, &auth).await?;
    let resp = recipe_service::delete_saved(&state.pool, &user, id).await?;
    Ok(Json(resp))
}
