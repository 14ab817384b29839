use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Plan;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
}

#[derive(Serialize, ToSchema)]
pub struct PlanList {
    pub items: Vec<Plan>,
}
