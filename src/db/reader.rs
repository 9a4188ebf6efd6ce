use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

use crate::config::{DAILY_REVENUE_FORECAST, HOURLY_FORECAST_PREFIX, SERVED_STATUS};
use crate::db::models::{DailyAggregate, ForecastRecord, HourlyAggregate, TopItem};
use crate::error::Result;

pub const DEFAULT_SUMMARY_LIMIT: i64 = 30;
pub const DEFAULT_HOURLY_DAYS_BACK: i64 = 7;
pub const DEFAULT_FORECAST_LIMIT: i64 = 7;
pub const DEFAULT_TOP_ITEMS_LIMIT: i64 = 10;

/// Query side of the analytics cache, used by the HTTP layer.
/// Never writes to either store.
#[derive(Clone)]
pub struct AnalyticsReader {
    analytics: SqlitePool,
    source: SqlitePool,
}

impl AnalyticsReader {
    pub fn new(analytics: SqlitePool, source: SqlitePool) -> Self {
        Self { analytics, source }
    }

    /// Cached daily summaries, newest first, optionally bounded by date.
    pub async fn daily_summaries(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<DailyAggregate>> {
        let rows = sqlx::query_as::<_, DailyAggregate>(
            r#"
            SELECT date, total_revenue, order_count, average_order_value
            FROM daily_revenue_cache
            WHERE (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.analytics)
        .await?;

        Ok(rows)
    }

    /// Hourly counts for the `days_back` days ending at `target` (default today),
    /// ordered by date then hour.
    pub async fn hourly_breakdown(
        &self,
        target: Option<NaiveDate>,
        days_back: i64,
    ) -> Result<Vec<HourlyAggregate>> {
        let target = target.unwrap_or_else(today);
        let start = target - Duration::days(days_back.max(1) - 1);

        let rows = sqlx::query_as::<_, HourlyAggregate>(
            r#"
            SELECT date, hour, order_count
            FROM hourly_order_cache
            WHERE date >= ? AND date <= ?
            ORDER BY date, hour
            "#,
        )
        .bind(start)
        .bind(target)
        .fetch_all(&self.analytics)
        .await?;

        Ok(rows)
    }

    /// Most recent forecasts of one type, latest forecast date first.
    pub async fn daily_forecasts(
        &self,
        forecast_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ForecastRecord>> {
        let rows = sqlx::query_as::<_, ForecastRecord>(
            r#"
            SELECT forecast_type, forecast_date, forecast_value, generated_at
            FROM forecast_history
            WHERE forecast_type = ?
            ORDER BY forecast_date DESC, generated_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(forecast_type.unwrap_or(DAILY_REVENUE_FORECAST))
        .bind(limit)
        .fetch_all(&self.analytics)
        .await?;

        Ok(rows)
    }

    /// Every `hourly_*` forecast targeting `date` (default tomorrow), by type.
    pub async fn hourly_forecasts(&self, date: Option<NaiveDate>) -> Result<Vec<ForecastRecord>> {
        let date = date.unwrap_or_else(|| today() + Duration::days(1));
        let pattern = format!("{HOURLY_FORECAST_PREFIX}%");

        let rows = sqlx::query_as::<_, ForecastRecord>(
            r#"
            SELECT forecast_type, forecast_date, forecast_value, generated_at
            FROM forecast_history
            WHERE forecast_type LIKE ? AND forecast_date = ?
            ORDER BY forecast_type, generated_at, id
            "#,
        )
        .bind(pattern)
        .bind(date)
        .fetch_all(&self.analytics)
        .await?;

        Ok(rows)
    }

    /// Best selling items over SERVED orders, computed live from the source store.
    pub async fn top_items(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<TopItem>> {
        let rows = sqlx::query_as::<_, TopItem>(
            r#"
            SELECT oi.item_id                          AS item_id,
                   oi.item_name                        AS item_name,
                   SUM(oi.quantity)                    AS total_quantity,
                   TOTAL(oi.quantity * oi.unit_price)  AS total_revenue
            FROM order_items oi
            JOIN orders o ON oi.order_id = o.id
            WHERE o.status = ?
              AND (? IS NULL OR date(o.created_at) >= ?)
              AND (? IS NULL OR date(o.created_at) <= ?)
            GROUP BY oi.item_id, oi.item_name
            ORDER BY total_quantity DESC
            LIMIT ?
            "#,
        )
        .bind(SERVED_STATUS)
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.source)
        .await?;

        Ok(rows)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{analytics_pool, insert_order, insert_order_item, source_pool};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    async fn seeded_reader() -> AnalyticsReader {
        let analytics = analytics_pool().await;
        for d in 1..=5u32 {
            sqlx::query(
                "INSERT INTO daily_revenue_cache (date, total_revenue, order_count, average_order_value) VALUES (?, ?, ?, ?)",
            )
            .bind(date(d))
            .bind(d as f64 * 100.0)
            .bind(i64::from(d))
            .bind(100.0)
            .execute(&analytics)
            .await
            .unwrap();
            for hour in 0..24i64 {
                sqlx::query("INSERT INTO hourly_order_cache (date, hour, order_count) VALUES (?, ?, ?)")
                    .bind(date(d))
                    .bind(hour)
                    .bind(hour)
                    .execute(&analytics)
                    .await
                    .unwrap();
            }
        }
        let at = date(5).and_hms_opt(0, 0, 0).unwrap();
        for (kind, target, value) in [
            ("daily_revenue", date(6), 600.0),
            ("daily_revenue", date(7), 700.0),
            ("hourly_01", date(6), 1.0),
            ("hourly_00", date(6), 0.5),
            ("hourly_00", date(7), 9.0),
        ] {
            sqlx::query(
                "INSERT INTO forecast_history (forecast_type, forecast_value, forecast_date, generated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(kind)
            .bind(value)
            .bind(target)
            .bind(at)
            .execute(&analytics)
            .await
            .unwrap();
        }
        AnalyticsReader::new(analytics, source_pool().await)
    }

    #[tokio::test]
    async fn summaries_are_newest_first_and_bounded() {
        let reader = seeded_reader().await;
        let all = reader.daily_summaries(None, None, 30).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].date, date(5));

        let ranged = reader
            .daily_summaries(Some(date(2)), Some(date(4)), 2)
            .await
            .unwrap();
        let dates: Vec<_> = ranged.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(4), date(3)]);
    }

    #[tokio::test]
    async fn hourly_breakdown_covers_lookback_window() {
        let reader = seeded_reader().await;
        let rows = reader.hourly_breakdown(Some(date(5)), 2).await.unwrap();
        assert_eq!(rows.len(), 48);
        assert_eq!(rows[0].date, date(4));
        assert_eq!(rows[0].hour, 0);
        assert_eq!(rows[47].date, date(5));
        assert_eq!(rows[47].hour, 23);
    }

    #[tokio::test]
    async fn daily_forecasts_filter_by_type() {
        let reader = seeded_reader().await;
        let rows = reader.daily_forecasts(None, 7).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].forecast_date, date(7));
        assert!(rows.iter().all(|r| r.forecast_type == "daily_revenue"));
    }

    #[tokio::test]
    async fn hourly_forecasts_match_prefix_and_date() {
        let reader = seeded_reader().await;
        let rows = reader.hourly_forecasts(Some(date(6))).await.unwrap();
        let kinds: Vec<_> = rows.iter().map(|r| r.forecast_type.as_str()).collect();
        assert_eq!(kinds, vec!["hourly_00", "hourly_01"]);
    }

    #[tokio::test]
    async fn top_items_rank_served_quantities() {
        let source = source_pool().await;
        let served = insert_order(&source, "2024-07-02 12:00:00", "SERVED", 30.0).await;
        let pending = insert_order(&source, "2024-07-02 13:00:00", "CREATED", 99.0).await;
        insert_order_item(&source, served, 1, "Espresso", 2, 3.0).await;
        insert_order_item(&source, served, 2, "Bagel", 5, 4.0).await;
        insert_order_item(&source, pending, 1, "Espresso", 50, 3.0).await;

        let reader = AnalyticsReader::new(analytics_pool().await, source);
        let items = reader.top_items(None, None, 10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_name, "Bagel");
        assert_eq!(items[0].total_quantity, 5);
        assert!((items[0].total_revenue - 20.0).abs() < 1e-9);
        assert_eq!(items[1].total_quantity, 2);

        let none = reader.top_items(Some(date(3)), None, 10).await.unwrap();
        assert!(none.is_empty());
    }
}
