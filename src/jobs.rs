use std::collections::HashMap;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use crate::{error::AppResult, services::report_service::today_midnight, state::AppState};

const REMINDER_LEAD_DAYS: i64 = 7;

/// Daily scan for products expiring in exactly seven days; each owner gets
/// one email listing their expiring items.
pub fn spawn_expiry_reminders(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            if let Err(err) = run_expiry_scan(&state).await {
                tracing::warn!(error = %err, "expiry reminder scan failed");
            }
        }
    });
}

#[derive(sqlx::FromRow)]
struct ReminderRow {
    email: String,
    user_name: String,
    product_name: String,
}

pub async fn run_expiry_scan(state: &AppState) -> AppResult<()> {
    let today = today_midnight(Utc::now());
    let window_start = today + ChronoDuration::days(REMINDER_LEAD_DAYS);
    let window_end = window_start + ChronoDuration::days(1);

    let rows: Vec<ReminderRow> = sqlx::query_as(
        r#"
        SELECT u.email, u.name AS user_name, p.name AS product_name
        FROM products p
        JOIN users u ON u.id = p.user_id
        WHERE p.expiry_date >= $1 AND p.expiry_date < $2
        ORDER BY u.email
        "#,
    )
    .bind(window_start)
    .bind(window_end)
    .fetch_all(&state.pool)
    .await?;

    let mut per_owner: HashMap<String, (String, Vec<String>)> = HashMap::new();
    for row in rows {
        per_owner
            .entry(row.email)
            .or_insert_with(|| (row.user_name, Vec::new()))
            .1
            .push(row.product_name);
    }

    let owners = per_owner.len();
    for (email, (name, items)) in per_owner {
        let body = format!(
            "Hi {name},\n\nThese items expire in {REMINDER_LEAD_DAYS} days:\n{}\n\nUse them up before they go to waste.",
            items
                .iter()
                .map(|i| format!("  - {i}"))
                .collect::<Vec<_>>()
                .join("\n")
        );
        if let Err(err) = state
            .mailer
            .send(&email, "Items expiring in a week", &body)
            .await
        {
            tracing::warn!(recipient = %email, error = %err, "expiry reminder send failed");
        }
    }

    tracing::info!(owners, "expiry reminder scan finished");
    Ok(())
}
