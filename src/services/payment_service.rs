use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    audit,
    clients::stripe::CheckoutSession,
    db::DbPool,
    dto::payments::{CreateSessionRequest, CreateSessionResponse, VerifySessionResponse},
    error::{AppError, AppResult},
    models::{PLAN_MONTHLY, Plan, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Currencies whose provider-reported integer amount is already whole units.
const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Provider minimum chargeable amount, in minor units, for standard currencies.
const MIN_CHARGE_MINOR: i64 = 50;

pub fn is_zero_decimal(currency: &str) -> bool {
    ZERO_DECIMAL_CURRENCIES.contains(&currency.to_uppercase().as_str())
}

/// Convert the provider's integer amount into plan-currency units.
pub fn amount_paid(amount_total: i64, currency: &str) -> f64 {
    if is_zero_decimal(currency) {
        amount_total as f64
    } else {
        amount_total as f64 / 100.0
    }
}

/// Convert a display amount into the provider's minor-unit integer.
pub fn to_minor_units(amount: f64, currency: &str) -> i64 {
    if is_zero_decimal(currency) {
        amount.round() as i64
    } else {
        (amount * 100.0).round() as i64
    }
}

pub fn check_minimum_charge(amount_minor: i64, currency: &str) -> AppResult<()> {
    if !is_zero_decimal(currency) && amount_minor < MIN_CHARGE_MINOR {
        return Err(AppError::BadRequest(
            "Amount is below the provider minimum for this currency".into(),
        ));
    }
    Ok(())
}

/// Monthly plans run 30 days; every other paid plan runs a year.
pub fn plan_expiry_for(plan_name: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    if plan_name == PLAN_MONTHLY {
        now + Duration::days(30)
    } else {
        now + Duration::days(365)
    }
}

/// A completed checkout, normalized from either the webhook or the
/// verification path.
#[derive(Debug, Clone)]
pub struct CheckoutCompleted {
    pub provider_id: String,
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub amount_total: i64,
    pub currency: String,
}

impl CheckoutCompleted {
    pub fn from_session(session: &CheckoutSession) -> AppResult<Self> {
        let user_id = session
            .metadata
            .get("user_id")
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| AppError::BadRequest("Session metadata missing user_id".into()))?;
        let plan_id = session
            .metadata
            .get("plan_id")
            .and_then(|v| Uuid::parse_str(v).ok());
        let plan_name = session.metadata.get("plan_name").cloned();
        Ok(Self {
            provider_id: session.id.clone(),
            user_id,
            plan_id,
            plan_name,
            amount_total: session.amount_total.unwrap_or(0),
            currency: session
                .currency
                .clone()
                .unwrap_or_else(|| "usd".to_string())
                .to_uppercase(),
        })
    }
}

/// Create a provider checkout session for a plan purchase. The plan price is
/// catalogued in USD and converted to the requested display currency via the
/// rate cache; conversion never blocks on a rate-provider outage.
pub async fn create_checkout_session(
    state: &AppState,
    user: &User,
    payload: CreateSessionRequest,
) -> AppResult<ApiResponse<CreateSessionResponse>> {
    let plan: Option<Plan> = sqlx::query_as("SELECT * FROM plans WHERE id = $1")
        .bind(payload.plan_id)
        .fetch_optional(&state.pool)
        .await?;
    let plan = match plan {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if plan.price <= 0.0 {
        return Err(AppError::BadRequest("Plan is not purchasable".into()));
    }

    let currency = payload
        .currency
        .unwrap_or_else(|| "USD".to_string())
        .to_uppercase();

    let rate = state.rates.get_rate(&currency).await;
    let converted = plan.price * rate;
    let amount_minor = to_minor_units(converted, &currency);
    check_minimum_charge(amount_minor, &currency)?;

    let frontend = &state.config.frontend_url;
    let params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), user.email.clone()),
        (
            "success_url".to_string(),
            format!("{frontend}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"),
        ),
        (
            "cancel_url".to_string(),
            format!("{frontend}/payment/cancelled"),
        ),
        (
            "line_items[0][price_data][currency]".to_string(),
            currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            format!("{} plan", plan.name),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("metadata[user_id]".to_string(), user.id.to_string()),
        ("metadata[plan_id]".to_string(), plan.id.to_string()),
        ("metadata[plan_name]".to_string(), plan.name.clone()),
    ];

    let session = state.stripe.create_checkout_session(&params).await?;
    let checkout_url = session
        .url
        .clone()
        .ok_or_else(|| AppError::Upstream("checkout session has no url".into()))?;

    Ok(ApiResponse::success(
        "Checkout session created",
        CreateSessionResponse {
            session_id: session.id,
            checkout_url,
            amount_minor,
            currency,
        },
        Some(Meta::empty()),
    ))
}

/// Apply a completed checkout exactly once per provider session id.
///
/// The subscription insert is the idempotency gate: `ON CONFLICT DO NOTHING`
/// on provider_id means a concurrent webhook and verification call can both
/// attempt it and whichever loses simply observes zero rows and stops. The
/// user upgrade rides in the same transaction so readers never see one
/// without the other. Returns whether this call applied the upgrade.
pub async fn reconcile(pool: &DbPool, event: &CheckoutCompleted) -> AppResult<bool> {
    let plan: Option<Plan> = match event.plan_id {
        Some(id) => {
            sqlx::query_as("SELECT * FROM plans WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    // The plan may have been deleted after checkout started; fall back to the
    // name carried in metadata.
    let plan_name = match (&plan, &event.plan_name) {
        (Some(p), _) => p.name.clone(),
        (None, Some(name)) => name.clone(),
        (None, None) => {
            return Err(AppError::BadRequest(
                "Cannot resolve plan for completed checkout".into(),
            ));
        }
    };

    let now = Utc::now();
    let expiry = plan_expiry_for(&plan_name, now);
    let amount = amount_paid(event.amount_total, &event.currency);

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO subscriptions
            (id, user_id, plan_id, plan_name, amount, currency, status, start_date, end_date, provider_id)
        VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $8, $9)
        ON CONFLICT (provider_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.user_id)
    .bind(plan.as_ref().map(|p| p.id))
    .bind(plan_name.as_str())
    .bind(amount)
    .bind(event.currency.as_str())
    .bind(now)
    .bind(expiry)
    .bind(event.provider_id.as_str())
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // Someone already reconciled this session.
        tx.rollback().await?;
        tracing::info!(provider_id = %event.provider_id, "checkout already reconciled, skipping");
        return Ok(false);
    }

    sqlx::query("UPDATE users SET plan = $1, plan_expiry = $2 WHERE id = $3")
        .bind(plan_name.as_str())
        .bind(expiry)
        .bind(event.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit::record(
        pool,
        Some(event.user_id),
        "payment_reconciled",
        Some("subscriptions"),
        Some(serde_json::json!({
            "provider_id": event.provider_id,
            "plan": plan_name,
            "amount": amount,
            "currency": event.currency,
        })),
    )
    .await;

    Ok(true)
}

/// Pull-based verification for when the webhook has not arrived yet. Fetches
/// the session from the provider and, if paid, runs the same idempotent
/// reconciliation the webhook handler uses.
pub async fn verify_session(
    state: &AppState,
    session_id: &str,
) -> AppResult<ApiResponse<VerifySessionResponse>> {
    let session = state.stripe.fetch_checkout_session(session_id).await?;

    let paid = session.payment_status.as_deref() == Some("paid");
    let mut plan = None;

    if paid {
        let event = CheckoutCompleted::from_session(&session)?;
        reconcile(&state.pool, &event).await?;
        plan = event.plan_name;
    }

    Ok(ApiResponse::success(
        if paid { "Payment verified" } else { "Payment not completed" },
        VerifySessionResponse {
            session_id: session.id,
            paid,
            plan,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn zero_decimal_amount_is_whole_units() {
        assert_eq!(amount_paid(1000, "JPY"), 1000.0);
        assert_eq!(amount_paid(1000, "jpy"), 1000.0);
    }

    #[test]
    fn standard_currency_amount_is_cents() {
        assert_eq!(amount_paid(1000, "USD"), 10.0);
        assert_eq!(amount_paid(1999, "EUR"), 19.99);
    }

    #[test]
    fn minor_units_round_to_nearest() {
        assert_eq!(to_minor_units(10.0, "USD"), 1000);
        assert_eq!(to_minor_units(10.999, "USD"), 1100);
        assert_eq!(to_minor_units(1000.4, "JPY"), 1000);
        assert_eq!(to_minor_units(1000.6, "JPY"), 1001);
    }

    #[test]
    fn minimum_charge_applies_to_standard_currencies_only() {
        assert!(check_minimum_charge(49, "USD").is_err());
        assert!(check_minimum_charge(50, "USD").is_ok());
        assert!(check_minimum_charge(1, "JPY").is_ok());
    }

    #[test]
    fn monthly_plan_runs_thirty_days() {
        let now = Utc::now();
        assert_eq!(plan_expiry_for("Monthly", now), now + Duration::days(30));
        assert_eq!(plan_expiry_for("Yearly", now), now + Duration::days(365));
        // Any unrecognized paid plan name defaults to a year.
        assert_eq!(plan_expiry_for("Lifetime", now), now + Duration::days(365));
    }

    #[test]
    fn session_metadata_maps_to_event() {
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("plan_id".to_string(), plan_id.to_string());
        metadata.insert("plan_name".to_string(), "Monthly".to_string());
        let session = CheckoutSession {
            id: "cs_test_123".into(),
            url: None,
            payment_status: Some("paid".into()),
            amount_total: Some(499),
            currency: Some("usd".into()),
            metadata,
        };
        let event = CheckoutCompleted::from_session(&session).unwrap();
        assert_eq!(event.user_id, user_id);
        assert_eq!(event.plan_id, Some(plan_id));
        assert_eq!(event.plan_name.as_deref(), Some("Monthly"));
        assert_eq!(event.currency, "USD");
        assert_eq!(event.amount_total, 499);
    }

    #[test]
    fn session_without_user_metadata_is_rejected() {
        let session = CheckoutSession {
            id: "cs_test_456".into(),
            url: None,
            payment_status: Some("paid".into()),
            amount_total: Some(499),
            currency: Some("usd".into()),
            metadata: HashMap::new(),
        };
        assert!(CheckoutCompleted::from_session(&session).is_err());
    }
}
