use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::SavedRecipe;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeSuggestion {
    pub recipe_text: String,
    /// Names of the near-expiry items the suggestion was built from.
    pub ingredients: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveRecipeRequest {
    pub product_name: String,
    pub recipe_text: String,
    pub product_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct SavedRecipeList {
    pub items: Vec<SavedRecipe>,
}
