use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const CACHE_TTL_HOURS: i64 = 24;

/// USD-based exchange-rate cache. Refreshed at most once per TTL window;
/// a provider outage falls back to the last good snapshot, then to 1:1.
/// Checkout creation must never fail because the rate service is down.
pub struct RateCache {
    http: reqwest::Client,
    base_url: String,
    inner: RwLock<Option<Snapshot>>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    fetched_at: DateTime<Utc>,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

impl RateCache {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            inner: RwLock::new(None),
        }
    }

    /// Resolve the USD -> `currency` rate, refreshing the snapshot when stale.
    pub async fn get_rate(&self, currency: &str) -> f64 {
        let currency = currency.to_uppercase();
        if currency == "USD" {
            return 1.0;
        }

        let now = Utc::now();
        let cached = self.inner.read().expect("rate cache poisoned").clone();

        if let Some(snapshot) = &cached {
            if is_fresh(snapshot.fetched_at, now) {
                return rate_from(&snapshot.rates, &currency);
            }
        }

        match self.fetch_rates().await {
            Ok(rates) => {
                let rate = rate_from(&rates, &currency);
                *self.inner.write().expect("rate cache poisoned") = Some(Snapshot {
                    fetched_at: now,
                    rates,
                });
                rate
            }
            Err(err) => {
                tracing::warn!(error = %err, "exchange rate fetch failed, using fallback");
                match cached {
                    Some(snapshot) => rate_from(&snapshot.rates, &currency),
                    None => 1.0,
                }
            }
        }
    }

    async fn fetch_rates(&self) -> anyhow::Result<HashMap<String, f64>> {
        let resp = self
            .http
            .get(format!("{}/USD", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let parsed: RatesResponse = resp.json().await?;
        Ok(parsed.rates)
    }
}

fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - fetched_at < Duration::hours(CACHE_TTL_HOURS)
}

fn rate_from(rates: &HashMap<String, f64>, currency: &str) -> f64 {
    match rates.get(currency) {
        Some(rate) if *rate > 0.0 => *rate,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_freshness_respects_ttl() {
        let now = Utc::now();
        assert!(is_fresh(now - Duration::hours(23), now));
        assert!(!is_fresh(now - Duration::hours(25), now));
    }

    #[test]
    fn unknown_currency_falls_back_to_parity() {
        let mut rates = HashMap::new();
        rates.insert("EUR".to_string(), 0.92);
        assert_eq!(rate_from(&rates, "EUR"), 0.92);
        assert_eq!(rate_from(&rates, "XYZ"), 1.0);
    }

    #[tokio::test]
    async fn provider_outage_without_cache_returns_parity() {
        // Nothing listens on this address; the fetch fails and falls back to 1:1.
        let cache = RateCache::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/latest".to_string(),
        );
        assert_eq!(cache.get_rate("EUR").await, 1.0);
    }

    #[tokio::test]
    async fn usd_is_always_parity() {
        let cache = RateCache::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/latest".to_string(),
        );
        assert_eq!(cache.get_rate("usd").await, 1.0);
    }
}
