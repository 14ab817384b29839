use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Advertisement;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAdvertRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAdvertRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AdvertList {
    pub items: Vec<Advertisement>,
}
