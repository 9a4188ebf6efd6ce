//! Row types for the analytics cache tables and the source aggregates.
//! Used by sqlx for typed queries and serialized as-is by the read API.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One row of `daily_revenue_cache`; `date` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_revenue: f64,
    pub order_count: i64,
    pub average_order_value: f64,
}

/// One row of `hourly_order_cache`; `(date, hour)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct HourlyAggregate {
    pub date: NaiveDate,
    pub hour: i64,
    pub order_count: i64,
}

/// One row of the append-only `forecast_history`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ForecastRecord {
    pub forecast_type: String,
    pub forecast_date: NaiveDate,
    pub forecast_value: f64,
    pub generated_at: NaiveDateTime,
}

/// Served-order totals for one calendar day in the source store.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct ServedTotals {
    pub total_revenue: f64,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TopItem {
    pub item_id: i64,
    pub item_name: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}
