use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Thin client over the hosted text/vision generation API. Responses are
/// advisory: callers re-validate everything before persisting.
pub struct AiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl AiClient {
    pub fn new(http: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
        }
    }

    pub async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        self.generate(body).await
    }

    /// Vision call: prompt plus one inline base64 image.
    pub async fn generate_from_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> AppResult<String> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": mime_type, "data": image_base64 } }
                ]
            }]
        });
        self.generate(body).await
    }

    async fn generate(&self, body: serde_json::Value) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{DEFAULT_MODEL}:generateContent?key={}",
            self.base_url, self.api_key
        );
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("ai generate: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("ai generate body: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "ai generate status={status} body={text}"
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("ai response parse: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Upstream("ai response had no candidates".into()))
    }
}
