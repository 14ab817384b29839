use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::reports::{MonthQuery, MonthlyReport, UserWasteReport, WasteByCategory},
    error::{AppError, AppResult},
    models::CATEGORY_FOOD,
    response::ApiResponse,
};

/// First instant of day 1 and last instant (23:59:59.999) of the last day
/// of the given month, UTC calendar.
pub fn month_bounds(month: u32, year: i32) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest("month must be 1-12".into()));
    }
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::BadRequest("invalid month/year".into()))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next_start = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::BadRequest("invalid month/year".into()))?;
    Ok((start, next_start - Duration::milliseconds(1)))
}

pub fn today_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN))
}

/// The wasted predicate is intentionally a triple bound: inside the queried
/// month AND already past today's midnight. Dropping the month range would
/// make future months report waste; dropping the today cutoff would count
/// items that have not expired yet.
pub fn is_wasted(
    expiry: DateTime<Utc>,
    month_start: DateTime<Utc>,
    month_end: DateTime<Utc>,
    today: DateTime<Utc>,
) -> bool {
    month_start <= expiry && expiry <= month_end && expiry < today
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn resolve_month(query: &MonthQuery, now: DateTime<Utc>) -> (u32, i32) {
    (
        query.month.unwrap_or_else(|| now.month()),
        query.year.unwrap_or_else(|| now.year()),
    )
}

#[derive(sqlx::FromRow)]
struct WasteRow {
    wasted_count: i64,
    total_waste: f64,
    food_waste: f64,
    non_food_waste: f64,
}

async fn waste_for(
    pool: &DbPool,
    user_id: Option<Uuid>,
    month_start: DateTime<Utc>,
    month_end: DateTime<Utc>,
    today: DateTime<Utc>,
) -> AppResult<WasteRow> {
    let row: WasteRow = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS wasted_count,
            COALESCE(SUM(COALESCE(price, 0)), 0) AS total_waste,
            COALESCE(SUM(COALESCE(price, 0)) FILTER (WHERE category = $4), 0) AS food_waste,
            COALESCE(SUM(COALESCE(price, 0)) FILTER (WHERE category <> $4), 0) AS non_food_waste
        FROM products
        WHERE expiry_date >= $1
          AND expiry_date <= $2
          AND expiry_date < $3
          AND ($5::uuid IS NULL OR user_id = $5)
        "#,
    )
    .bind(month_start)
    .bind(month_end)
    .bind(today)
    .bind(CATEGORY_FOOD)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Monthly dashboard aggregate: waste across all users plus USD subscription
/// revenue for the same month.
pub async fn monthly_report(
    pool: &DbPool,
    query: MonthQuery,
) -> AppResult<ApiResponse<MonthlyReport>> {
    let now = Utc::now();
    let (month, year) = resolve_month(&query, now);
    let (month_start, month_end) = month_bounds(month, year)?;
    let today = today_midnight(now);

    let waste = waste_for(pool, None, month_start, month_end, today).await?;

    // Mixed currencies are not summed; only USD subscriptions count here.
    let revenue: (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM subscriptions
        WHERE status = 'active'
          AND created_at >= $1
          AND created_at <= $2
          AND currency = 'USD'
        "#,
    )
    .bind(month_start)
    .bind(month_end)
    .fetch_one(pool)
    .await?;

    let report = MonthlyReport {
        month,
        year,
        total_waste: round2(waste.total_waste),
        wasted_count: waste.wasted_count,
        waste_by_category: WasteByCategory {
            food: round2(waste.food_waste),
            non_food: round2(waste.non_food_waste),
        },
        revenue: round2(revenue.0),
    };
    Ok(ApiResponse::success("Monthly report", report, None))
}

/// Per-user waste report. Premium gating happens in the handler via the
/// plan lifecycle check before this runs.
pub async fn user_waste_report(
    pool: &DbPool,
    user_id: Uuid,
    query: MonthQuery,
) -> AppResult<ApiResponse<UserWasteReport>> {
    let now = Utc::now();
    let (month, year) = resolve_month(&query, now);
    let (month_start, month_end) = month_bounds(month, year)?;
    let today = today_midnight(now);

    let waste = waste_for(pool, Some(user_id), month_start, month_end, today).await?;

    let report = UserWasteReport {
        month,
        year,
        total_waste: round2(waste.total_waste),
        wasted_count: waste.wasted_count,
        waste_by_category: WasteByCategory {
            food: round2(waste.food_waste),
            non_food: round2(waste.non_food_waste),
        },
    };
    Ok(ApiResponse::success("Waste report", report, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn june_bounds_cover_the_whole_month() {
        let (start, end) = month_bounds(6, 2025).unwrap();
        assert_eq!(start, ts("2025-06-01T00:00:00Z"));
        assert_eq!(end, ts("2025-06-30T23:59:59.999Z"));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (start, end) = month_bounds(12, 2025).unwrap();
        assert_eq!(start, ts("2025-12-01T00:00:00Z"));
        assert_eq!(end, ts("2025-12-31T23:59:59.999Z"));
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(month_bounds(0, 2025).is_err());
        assert!(month_bounds(13, 2025).is_err());
    }

    #[test]
    fn expired_item_counts_for_its_month() {
        // today = 2025-06-15
        let today = ts("2025-06-15T00:00:00Z");
        let (start, end) = month_bounds(6, 2025).unwrap();
        assert!(is_wasted(ts("2025-06-10T12:00:00Z"), start, end, today));
    }

    #[test]
    fn unexpired_item_does_not_count_yet() {
        let today = ts("2025-06-15T00:00:00Z");
        let (start, end) = month_bounds(6, 2025).unwrap();
        assert!(!is_wasted(ts("2025-06-20T12:00:00Z"), start, end, today));
    }

    #[test]
    fn expired_item_outside_queried_month_does_not_count() {
        let today = ts("2025-06-15T00:00:00Z");
        let (start, end) = month_bounds(7, 2025).unwrap();
        assert!(!is_wasted(ts("2025-06-10T12:00:00Z"), start, end, today));
    }

    #[test]
    fn future_month_yields_no_waste() {
        let today = ts("2025-06-15T00:00:00Z");
        let (start, end) = month_bounds(8, 2025).unwrap();
        // Anything inside August 2025 is >= today, so the cutoff excludes it.
        assert!(!is_wasted(ts("2025-08-03T00:00:00Z"), start, end, today));
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(10.126), 10.13);
        assert_eq!(round2(0.0), 0.0);
    }
}
