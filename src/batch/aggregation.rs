use chrono::NaiveDate;
use tracing::info;

use crate::db::models::{DailyAggregate, ServedTotals};
use crate::db::{AnalyticsSession, SourceSession};
use crate::error::Result;
use crate::forecast::hourly::HOURS_PER_DAY;
use crate::forecast::round2;

/// Compute `date`'s served revenue, count and average, and upsert it.
pub async fn aggregate_day(
    source: &mut SourceSession,
    analytics: &mut AnalyticsSession,
    date: NaiveDate,
) -> Result<DailyAggregate> {
    info!(target_date = %date, "Computing daily revenue for {date}");

    let totals = source.served_totals(date).await?;
    let agg = daily_aggregate(date, totals);
    analytics.upsert_daily(&agg).await?;

    info!(
        target_date = %date,
        revenue = agg.total_revenue,
        orders = agg.order_count,
        average = agg.average_order_value,
        "  Revenue: ${:.2}, Orders: {}, Avg: ${:.2}",
        agg.total_revenue, agg.order_count, agg.average_order_value,
    );
    Ok(agg)
}

/// Count `date`'s served orders per hour and upsert all 24 hours.
pub async fn aggregate_hours(
    source: &mut SourceSession,
    analytics: &mut AnalyticsSession,
    date: NaiveDate,
) -> Result<[i64; 24]> {
    info!(target_date = %date, "Computing hourly breakdown for {date}");

    let rows = source.served_counts_by_hour(date).await?;
    let counts = full_day_counts(&rows);
    for (hour, &count) in (0..HOURS_PER_DAY).zip(counts.iter()) {
        analytics.upsert_hourly(date, hour, count).await?;
    }

    info!(target_date = %date, "  Stored hourly breakdown for {date}");
    Ok(counts)
}

pub fn daily_aggregate(date: NaiveDate, totals: ServedTotals) -> DailyAggregate {
    let average_order_value = if totals.order_count > 0 {
        totals.total_revenue / totals.order_count as f64
    } else {
        0.0
    };
    DailyAggregate {
        date,
        total_revenue: round2(totals.total_revenue),
        order_count: totals.order_count,
        average_order_value: round2(average_order_value),
    }
}

/// Dense 24-slot counts; hours absent from `rows` are 0.
pub fn full_day_counts(rows: &[(i64, i64)]) -> [i64; 24] {
    let mut counts = [0i64; 24];
    for &(hour, count) in rows {
        if let Some(slot) = usize::try_from(hour).ok().and_then(|h| counts.get_mut(h)) {
            *slot = count;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{analytics_pool, databases, insert_order, source_pool};
    use crate::db::Databases;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    #[test]
    fn average_is_zero_without_orders() {
        let agg = daily_aggregate(day(), ServedTotals { total_revenue: 0.0, order_count: 0 });
        assert_eq!(agg.average_order_value, 0.0);
    }

    #[test]
    fn average_is_rounded_to_cents() {
        let agg = daily_aggregate(day(), ServedTotals { total_revenue: 10.0, order_count: 3 });
        assert_eq!(agg.average_order_value, 3.33);
    }

    #[test]
    fn sparse_hours_are_filled_with_zero() {
        let counts = full_day_counts(&[(0, 2), (13, 7), (23, 1), (24, 9), (-1, 9)]);
        assert_eq!(counts.iter().sum::<i64>(), 10);
        assert_eq!(counts[13], 7);
        assert_eq!(counts[12], 0);
    }

    #[tokio::test]
    async fn writes_daily_row_and_full_hour_coverage() {
        let dbs = databases().await;

        let mut source = dbs.source_session().await.unwrap();
        let mut analytics = dbs.analytics_session().await.unwrap();
        let agg = aggregate_day(&mut source, &mut analytics, day()).await.unwrap();
        let counts = aggregate_hours(&mut source, &mut analytics, day()).await.unwrap();
        analytics.commit().await.unwrap();

        assert_eq!(agg.order_count, 0);
        assert_eq!(counts, [0; 24]);

        let rows = dbs.reader().hourly_breakdown(Some(day()), 1).await.unwrap();
        assert_eq!(rows.len(), 24);
    }

    #[tokio::test]
    async fn rerun_overwrites_in_place() {
        let source_pool = source_pool().await;
        let dbs = Databases::new(source_pool.clone(), analytics_pool().await);

        insert_order(&source_pool, "2024-02-29 08:00:00", "SERVED", 12.0).await;
        for _ in 0..2 {
            {
                let mut source = dbs.source_session().await.unwrap();
                let mut analytics = dbs.analytics_session().await.unwrap();
                aggregate_day(&mut source, &mut analytics, day()).await.unwrap();
                aggregate_hours(&mut source, &mut analytics, day()).await.unwrap();
                analytics.commit().await.unwrap();
            }
            insert_order(&source_pool, "2024-02-29 09:30:00", "SERVED", 8.0).await;
        }

        let summaries = dbs.reader().daily_summaries(None, None, 30).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].order_count, 2);
        assert_eq!(summaries[0].total_revenue, 20.0);

        let hours = dbs.reader().hourly_breakdown(Some(day()), 1).await.unwrap();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[8].order_count, 1);
        assert_eq!(hours[9].order_count, 1);
    }
}
