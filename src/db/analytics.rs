use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Sqlite, Transaction};

use crate::db::models::DailyAggregate;
use crate::error::Result;
use crate::types::{ForecastType, HistoricalPoint, HourlySample};

/// Read-write transaction on the analytics store.
///
/// All writes of one batch run go through a single session and become
/// visible together on [`commit`](Self::commit). Dropping the session
/// without committing discards them.
pub struct AnalyticsSession {
    tx: Transaction<'static, Sqlite>,
}

impl AnalyticsSession {
    pub fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Insert or overwrite the cache row for `agg.date`.
    pub async fn upsert_daily(&mut self, agg: &DailyAggregate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_revenue_cache (date, total_revenue, order_count, average_order_value)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                total_revenue = excluded.total_revenue,
                order_count = excluded.order_count,
                average_order_value = excluded.average_order_value
            "#,
        )
        .bind(agg.date)
        .bind(agg.total_revenue)
        .bind(agg.order_count)
        .bind(agg.average_order_value)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Insert or overwrite the cache row for `(date, hour)`.
    pub async fn upsert_hourly(&mut self, date: NaiveDate, hour: u32, order_count: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hourly_order_cache (date, hour, order_count)
            VALUES (?, ?, ?)
            ON CONFLICT(date, hour) DO UPDATE SET
                order_count = excluded.order_count
            "#,
        )
        .bind(date)
        .bind(i64::from(hour))
        .bind(order_count)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Append one forecast row. Earlier forecasts for the same date are kept.
    pub async fn insert_forecast(
        &mut self,
        forecast_type: ForecastType,
        forecast_date: NaiveDate,
        forecast_value: f64,
        generated_at: NaiveDateTime,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forecast_history (forecast_type, forecast_value, forecast_date, generated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(forecast_type.to_string())
        .bind(forecast_value)
        .bind(forecast_date)
        .bind(generated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Cached daily revenue on or after `since`, oldest first.
    /// Sees rows written earlier in this same session.
    pub async fn daily_history(&mut self, since: NaiveDate) -> Result<Vec<HistoricalPoint>> {
        let rows = sqlx::query_as::<_, (NaiveDate, f64)>(
            r#"
            SELECT date, total_revenue
            FROM daily_revenue_cache
            WHERE date >= ?
            ORDER BY date
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, value)| HistoricalPoint::new(date, value))
            .collect())
    }

    /// Cached hourly counts on or after `since`, oldest day first.
    pub async fn hourly_history(&mut self, since: NaiveDate) -> Result<Vec<HourlySample>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT hour, order_count
            FROM hourly_order_cache
            WHERE date >= ?
            ORDER BY date, hour
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(hour, count)| {
                u32::try_from(hour)
                    .ok()
                    .map(|hour| HourlySample { hour, count })
            })
            .collect())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
