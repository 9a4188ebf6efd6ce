use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

use crate::config::SERVED_STATUS;
use crate::db::models::ServedTotals;
use crate::error::Result;

/// Read-only connection to the transactional order store.
/// Exposes queries only; nothing here issues a write.
pub struct SourceSession {
    conn: PoolConnection<Sqlite>,
}

impl SourceSession {
    pub fn new(conn: PoolConnection<Sqlite>) -> Self {
        Self { conn }
    }

    /// Revenue and count of SERVED orders created on `date`.
    pub async fn served_totals(&mut self, date: NaiveDate) -> Result<ServedTotals> {
        let totals = sqlx::query_as::<_, ServedTotals>(
            r#"
            SELECT TOTAL(total_amount) AS total_revenue,
                   COUNT(id)           AS order_count
            FROM orders
            WHERE status = ? AND date(created_at) = ?
            "#,
        )
        .bind(SERVED_STATUS)
        .bind(date)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(totals)
    }

    /// `(hour, count)` of SERVED orders created on `date`, only for hours that
    /// had at least one order, ascending by hour.
    pub async fn served_counts_by_hour(&mut self, date: NaiveDate) -> Result<Vec<(i64, i64)>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT CAST(strftime('%H', created_at) AS INTEGER) AS hour,
                   COUNT(id)                                    AS order_count
            FROM orders
            WHERE status = ? AND date(created_at) = ?
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(SERVED_STATUS)
        .bind(date)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}
