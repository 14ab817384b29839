use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

/// Minimal payment-provider client over the Stripe REST API.
/// Only the checkout-session surface this service needs.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSession,
}

impl StripeClient {
    pub fn new(
        http: reqwest::Client,
        secret_key: String,
        webhook_secret: String,
        base_url: String,
    ) -> Self {
        Self {
            http,
            secret_key,
            webhook_secret,
            base_url,
        }
    }

    pub async fn create_checkout_session(
        &self,
        params: &[(String, String)],
    ) -> AppResult<CheckoutSession> {
        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("stripe session create: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("stripe session create body: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "stripe session create status={status} body={body}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("stripe session parse: {e}")))
    }

    pub async fn fetch_checkout_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.base_url
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("stripe session fetch: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("stripe session fetch body: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "stripe session fetch status={status} body={body}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("stripe session parse: {e}")))
    }

    /// Verify a `Stripe-Signature` header (`t=...,v1=...`) against the raw body.
    /// Rejects timestamps outside a 5-minute window.
    pub fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> AppResult<WebhookEvent> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            Utc::now().timestamp(),
        )?;

        serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))
    }
}

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

fn parse_signature_header(header: &str) -> Result<(i64, String), AppError> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => v1 = Some(value.to_string()),
            _ => {}
        }
    }
    match (timestamp, v1) {
        (Some(t), Some(sig)) => Ok((t, sig)),
        _ => Err(AppError::BadRequest("Invalid signature header".into())),
    }
}

fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> AppResult<()> {
    let (timestamp, expected_sig) = parse_signature_header(signature_header)?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::BadRequest(
            "Signature timestamp outside tolerance".into(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::BadRequest("Invalid webhook secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let expected = hex::decode(expected_sig.as_bytes())
        .map_err(|_| AppError::BadRequest("Invalid signature encoding".into()))?;

    // verify_slice is constant-time.
    mac.verify_slice(&expected)
        .map_err(|_| AppError::BadRequest("Signature mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }

    #[test]
    fn parses_signature_header() {
        let (t, v1) = parse_signature_header("t=1609459200,v1=abcdef").unwrap();
        assert_eq!(t, 1609459200);
        assert_eq!(v1, "abcdef");
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(parse_signature_header("garbage").is_err());
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, "whsec_test", now);
        assert!(verify_signature(payload, &header, "whsec_test", now).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = sign(payload, "whsec_test", now);
        assert!(verify_signature(payload, &header, "whsec_other", now).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let header = sign(payload, "whsec_test", signed_at);
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_signature(payload, &header, "whsec_test", now).is_err());
    }
}
