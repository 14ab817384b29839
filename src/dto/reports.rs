use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    /// 1-12, defaults to the current month.
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WasteByCategory {
    pub food: f64,
    pub non_food: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub month: u32,
    pub year: i32,
    pub total_waste: f64,
    pub wasted_count: i64,
    pub waste_by_category: WasteByCategory,
    pub revenue: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserWasteReport {
    pub month: u32,
    pub year: i32,
    pub total_waste: f64,
    pub wasted_count: i64,
    pub waste_by_category: WasteByCategory,
}
