use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub user_count: i64,
    pub product_count: i64,
    pub monthly_waste: f64,
    pub monthly_revenue: f64,
}

#[derive(Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PromotionRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionResponse {
    /// Intended recipients; sends continue in the background.
    pub recipients: usize,
}
