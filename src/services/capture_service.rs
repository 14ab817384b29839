use serde::Deserialize;

use crate::{
    dto::capture::{ProductDraft, ScanImageRequest, SpoilageEstimate},
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

const LABEL_PROMPT: &str = "Extract product details from this label photo. \
Respond with only a JSON object with keys: name (string), price (number), \
quantity (number), unit (string), expiry_date (ISO 8601 date string), \
category ('Food' or 'Non-Food'). Use null for anything not visible.";

const CONDITION_PROMPT: &str = "Look at this food item and estimate its condition. \
Respond with only a JSON object with keys: condition ('fresh', 'aging' or 'spoiled') \
and notes (short string).";

/// OCR/vision assisted draft from a label photo. Advisory only; the caller
/// re-validates and may override every field before a product is created.
pub async fn scan_label(
    state: &AppState,
    payload: ScanImageRequest,
) -> AppResult<ApiResponse<ProductDraft>> {
    if payload.image_base64.is_empty() {
        return Err(AppError::BadRequest("image_base64 is required".into()));
    }
    let mime = payload.mime_type.as_deref().unwrap_or("image/jpeg");
    let raw = state
        .ai
        .generate_from_image(LABEL_PROMPT, &payload.image_base64, mime)
        .await?;
    let draft = parse_draft(&raw)
        .ok_or_else(|| AppError::Upstream(format!("unparseable label response: {raw}")))?;
    Ok(ApiResponse::success("Label scanned", draft, None))
}

pub async fn estimate_condition(
    state: &AppState,
    payload: ScanImageRequest,
) -> AppResult<ApiResponse<SpoilageEstimate>> {
    if payload.image_base64.is_empty() {
        return Err(AppError::BadRequest("image_base64 is required".into()));
    }
    let mime = payload.mime_type.as_deref().unwrap_or("image/jpeg");
    let raw = state
        .ai
        .generate_from_image(CONDITION_PROMPT, &payload.image_base64, mime)
        .await?;

    #[derive(Deserialize)]
    struct RawEstimate {
        condition: String,
        notes: Option<String>,
    }
    let parsed: RawEstimate = serde_json::from_str(strip_fences(&raw))
        .map_err(|e| AppError::Upstream(format!("unparseable condition response: {e}")))?;

    Ok(ApiResponse::success(
        "Condition estimated",
        SpoilageEstimate {
            condition: parsed.condition,
            notes: parsed.notes,
        },
        None,
    ))
}

/// Barcode lookup against an Open Food Facts style endpoint.
pub async fn barcode_lookup(state: &AppState, code: &str) -> AppResult<ApiResponse<ProductDraft>> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("barcode must be numeric".into()));
    }

    #[derive(Deserialize)]
    struct OffResponse {
        status: i32,
        product: Option<OffProduct>,
    }
    #[derive(Deserialize)]
    struct OffProduct {
        product_name: Option<String>,
        quantity: Option<String>,
    }

    let url = format!(
        "{}/api/v2/product/{code}.json",
        state.config.barcode_base_url
    );
    let resp = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("barcode lookup: {e}")))?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound);
    }
    let parsed: OffResponse = resp
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("barcode response parse: {e}")))?;

    let product = match (parsed.status, parsed.product) {
        (1, Some(p)) => p,
        _ => return Err(AppError::NotFound),
    };

    let draft = ProductDraft {
        name: product.product_name,
        unit: product.quantity,
        category: Some("Food".to_string()),
        ..Default::default()
    };
    Ok(ApiResponse::success("Barcode resolved", draft, None))
}

/// Models often wrap JSON in markdown fences; tolerate that.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn parse_draft(raw: &str) -> Option<ProductDraft> {
    serde_json::from_str(strip_fences(raw)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_draft() {
        let raw = r#"{"name":"Milk","price":2.49,"quantity":1,"unit":"l","expiry_date":"2025-07-01","category":"Food"}"#;
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.name.as_deref(), Some("Milk"));
        assert_eq!(draft.price, Some(2.49));
        assert_eq!(draft.category.as_deref(), Some("Food"));
    }

    #[test]
    fn parses_fenced_json_draft() {
        let raw = "```json\n{\"name\":\"Bread\",\"price\":null,\"quantity\":null,\"unit\":null,\"expiry_date\":null,\"category\":null}\n```";
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.name.as_deref(), Some("Bread"));
        assert!(draft.price.is_none());
    }

    #[test]
    fn garbage_yields_no_draft() {
        assert!(parse_draft("sorry, I cannot read this label").is_none());
    }
}
