use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Best-effort draft extracted from a label photo or barcode lookup.
/// Advisory only: never trusted for quota or billing decisions.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub expiry_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanImageRequest {
    /// Base64-encoded image bytes.
    pub image_base64: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpoilageEstimate {
    pub condition: String,
    pub notes: Option<String>,
}
