use std::time::Instant;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::batch::aggregation;
use crate::batch::guard::{BatchState, RunGuard, StateCell};
use crate::config::{ForecastConfig, DAILY_FORECAST_HORIZON_DAYS};
use crate::db::models::DailyAggregate;
use crate::db::{AnalyticsSession, Databases, SourceSession};
use crate::error::Result;
use crate::forecast::Forecaster;
use crate::types::{ForecastType, HistoricalPoint};

/// What one batch invocation did.
#[derive(Debug)]
pub enum BatchOutcome {
    Completed(BatchReport),
    /// Another run held the guard; nothing was touched.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub target_date: NaiveDate,
    pub daily: DailyAggregate,
    pub hourly_counts: Vec<i64>,
    pub daily_forecasts: Vec<(NaiveDate, f64)>,
    pub hourly_forecasts: Vec<(u32, f64)>,
    pub generated_at: NaiveDateTime,
    pub elapsed_ms: u64,
}

/// Runs the nightly aggregate/forecast job against one analytics
/// transaction. Shared behind an `Arc` by the scheduler, the API and the
/// manual runner; the guard keeps their runs mutually exclusive.
pub struct BatchOrchestrator {
    databases: Databases,
    forecaster: Forecaster,
    guard: RunGuard,
    state: StateCell,
}

impl BatchOrchestrator {
    pub fn new(databases: Databases, cfg: ForecastConfig) -> Self {
        Self {
            databases,
            forecaster: Forecaster::new(cfg),
            guard: RunGuard::new(),
            state: StateCell::default(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_held()
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    /// Run for the local calendar day.
    pub async fn run_batch_job(&self) -> Result<BatchOutcome> {
        self.run_batch_for(Local::now().date_naive()).await
    }

    /// Aggregate `today - 1`, then forecast forward from `today`.
    pub async fn run_batch_for(&self, today: NaiveDate) -> Result<BatchOutcome> {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!(outcome = "skipped", "Batch job already running, skipping this trigger");
            return Ok(BatchOutcome::Skipped);
        };
        // Declared after the permit so the state is reset before the guard frees.
        let _reset = self.state.idle_on_drop();
        self.state.set(BatchState::Acquiring);

        let started = Instant::now();
        let target_date = today - Duration::days(1);
        info!(target_date = %target_date, "Starting batch job for {target_date}");

        let (mut source, mut analytics) = match self.open_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(
                    target_date = %target_date,
                    outcome = "failed",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Batch job could not open its sessions: {e}",
                );
                return Err(e);
            }
        };
        self.state.set(BatchState::Running);

        let generated_at = Utc::now().naive_utc();
        match self
            .run_steps(&mut source, &mut analytics, today, generated_at)
            .await
        {
            Ok(mut report) => {
                self.state.set(BatchState::Committing);
                if let Err(e) = analytics.commit().await {
                    error!(
                        target_date = %target_date,
                        outcome = "commit_failed",
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Batch job commit failed: {e}",
                    );
                    return Err(e);
                }
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                info!(
                    target_date = %target_date,
                    outcome = "committed",
                    elapsed_ms = report.elapsed_ms,
                    "Batch job completed for {target_date}",
                );
                Ok(BatchOutcome::Completed(report))
            }
            Err(e) => {
                self.state.set(BatchState::RollingBack);
                error!(
                    target_date = %target_date,
                    outcome = "rolled_back",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Batch job failed, rolling back: {e}",
                );
                if let Err(rb) = analytics.rollback().await {
                    error!("Rollback failed: {rb}");
                }
                Err(e)
            }
        }
    }

    async fn open_sessions(&self) -> Result<(SourceSession, AnalyticsSession)> {
        let source = self.databases.source_session().await?;
        let analytics = self.databases.analytics_session().await?;
        Ok((source, analytics))
    }

    async fn run_steps(
        &self,
        source: &mut SourceSession,
        analytics: &mut AnalyticsSession,
        today: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> Result<BatchReport> {
        let target_date = today - Duration::days(1);

        let daily = aggregation::aggregate_day(source, analytics, target_date).await?;
        let hourly_counts = aggregation::aggregate_hours(source, analytics, target_date).await?;
        let daily_forecasts = self.forecast_daily(analytics, today, generated_at).await?;
        let hourly_forecasts = self.forecast_hourly(analytics, today, generated_at).await?;

        Ok(BatchReport {
            target_date,
            daily,
            hourly_counts: hourly_counts.to_vec(),
            daily_forecasts,
            hourly_forecasts,
            generated_at,
            elapsed_ms: 0,
        })
    }

    async fn forecast_daily(
        &self,
        analytics: &mut AnalyticsSession,
        today: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let since = today - Duration::days(self.forecaster.config().history_days_daily);
        let history = analytics.daily_history(since).await?;
        if history.is_empty() {
            warn!(since = %since, "No daily history since {since}, skipping daily forecast");
            return Ok(Vec::new());
        }

        let forecasts =
            progressive_forecasts(&self.forecaster, &history, today, DAILY_FORECAST_HORIZON_DAYS);
        for (days_ahead, &(date, value)) in (1u32..).zip(forecasts.iter()) {
            analytics
                .insert_forecast(ForecastType::DailyRevenue, date, value, generated_at)
                .await?;
            info!(
                days_ahead,
                forecast_date = %date,
                forecast_value = value,
                "  Day +{days_ahead} ({date}): ${value:.2}",
            );
        }
        Ok(forecasts)
    }

    async fn forecast_hourly(
        &self,
        analytics: &mut AnalyticsSession,
        today: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<(u32, f64)>> {
        let since = today - Duration::days(self.forecaster.config().history_days_hourly);
        let samples = analytics.hourly_history(since).await?;
        if samples.is_empty() {
            warn!(since = %since, "No hourly history since {since}, skipping hourly forecast");
            return Ok(Vec::new());
        }

        let tomorrow = today + Duration::days(1);
        let forecasts = self.forecaster.hourly_forecast(&samples);
        for &(hour, value) in &forecasts {
            analytics
                .insert_forecast(ForecastType::Hourly(hour), tomorrow, value, generated_at)
                .await?;
        }
        info!(
            forecast_date = %tomorrow,
            hours = forecasts.len(),
            "Stored hourly forecast for {tomorrow}",
        );
        Ok(forecasts)
    }
}

/// Forecast `horizon` consecutive days after `today`. Each day's forecast
/// is appended to the series before forecasting the next one.
pub fn progressive_forecasts(
    forecaster: &Forecaster,
    history: &[HistoricalPoint],
    today: NaiveDate,
    horizon: u32,
) -> Vec<(NaiveDate, f64)> {
    let mut series = history.to_vec();
    let mut out = Vec::with_capacity(horizon as usize);
    for days_ahead in 1..=horizon {
        let date = today + Duration::days(i64::from(days_ahead));
        let value = forecaster.daily_forecast(&series);
        out.push((date, value));
        series.push(HistoricalPoint::new(date, value));
    }
    out
}
