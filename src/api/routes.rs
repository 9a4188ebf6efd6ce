use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::health::{health, root};
use crate::batch::{BatchOrchestrator, BatchScheduler};
use crate::db::models::{DailyAggregate, ForecastRecord, HourlyAggregate, TopItem};
use crate::db::reader::{
    AnalyticsReader, DEFAULT_FORECAST_LIMIT, DEFAULT_HOURLY_DAYS_BACK, DEFAULT_SUMMARY_LIMIT,
    DEFAULT_TOP_ITEMS_LIMIT,
};
use crate::error::AppError;

#[derive(Clone)]
pub struct ApiState {
    pub reader: AnalyticsReader,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub scheduler: Arc<BatchScheduler>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analytics/daily-summary", get(get_daily_summary))
        .route("/analytics/hourly-breakdown", get(get_hourly_breakdown))
        .route("/analytics/top-items", get(get_top_items))
        .route("/analytics/forecast/daily", get(get_daily_forecast))
        .route("/analytics/forecast/hourly", get(get_hourly_forecast))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct HourlyBreakdownQuery {
    pub target_date: Option<NaiveDate>,
    pub days_back: Option<i64>,
}

#[derive(Deserialize)]
pub struct DailyForecastQuery {
    pub forecast_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct HourlyForecastQuery {
    pub forecast_date: Option<NaiveDate>,
}

fn positive(value: Option<i64>, default: i64, name: &str) -> Result<i64, AppError> {
    match value {
        None => Ok(default),
        Some(v) if v > 0 => Ok(v),
        Some(_) => Err(AppError::InvalidParameter(format!("{name} must be positive"))),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_daily_summary(
    State(state): State<ApiState>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Json<Vec<DailyAggregate>>, AppError> {
    let limit = positive(params.limit, DEFAULT_SUMMARY_LIMIT, "limit")?;
    let rows = state
        .reader
        .daily_summaries(params.start_date, params.end_date, limit)
        .await?;
    Ok(Json(rows))
}

async fn get_hourly_breakdown(
    State(state): State<ApiState>,
    Query(params): Query<HourlyBreakdownQuery>,
) -> Result<Json<Vec<HourlyAggregate>>, AppError> {
    let days_back = positive(params.days_back, DEFAULT_HOURLY_DAYS_BACK, "days_back")?;
    let rows = state
        .reader
        .hourly_breakdown(params.target_date, days_back)
        .await?;
    Ok(Json(rows))
}

async fn get_top_items(
    State(state): State<ApiState>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Json<Vec<TopItem>>, AppError> {
    let limit = positive(params.limit, DEFAULT_TOP_ITEMS_LIMIT, "limit")?;
    let rows = state
        .reader
        .top_items(params.start_date, params.end_date, limit)
        .await?;
    Ok(Json(rows))
}

async fn get_daily_forecast(
    State(state): State<ApiState>,
    Query(params): Query<DailyForecastQuery>,
) -> Result<Json<Vec<ForecastRecord>>, AppError> {
    let limit = positive(params.limit, DEFAULT_FORECAST_LIMIT, "limit")?;
    let rows = state
        .reader
        .daily_forecasts(params.forecast_type.as_deref(), limit)
        .await?;
    Ok(Json(rows))
}

async fn get_hourly_forecast(
    State(state): State<ApiState>,
    Query(params): Query<HourlyForecastQuery>,
) -> Result<Json<Vec<ForecastRecord>>, AppError> {
    let rows = state.reader.hourly_forecasts(params.forecast_date).await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::{ForecastConfig, SchedulerConfig};
    use crate::db::testing::databases;

    async fn app() -> (Router, Arc<BatchOrchestrator>) {
        let dbs = databases().await;
        let orchestrator = Arc::new(BatchOrchestrator::new(dbs.clone(), ForecastConfig::default()));
        let scheduler = Arc::new(BatchScheduler::new(
            Arc::clone(&orchestrator),
            SchedulerConfig {
                enabled: false,
                ..SchedulerConfig::default()
            },
        ));
        let state = ApiState {
            reader: dbs.reader(),
            orchestrator: Arc::clone(&orchestrator),
            scheduler,
        };
        (router(state), orchestrator)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn root_reports_service_state() {
        let (app, _) = app().await;
        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "order-analytics");
        assert_eq!(body["batch_in_progress"], false);
        assert_eq!(body["scheduler_running"], false);
        assert_eq!(body["batch_state"], "idle");
    }

    #[tokio::test]
    async fn health_reports_inactive_scheduler() {
        let (app, _) = app().await;
        let (status, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scheduler"], "inactive");
    }

    #[tokio::test]
    async fn forecasts_are_served_after_a_run() {
        let (app, orchestrator) = app().await;
        let today = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
        orchestrator.run_batch_for(today).await.unwrap();

        let (status, body) = get(app.clone(), "/analytics/forecast/daily").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0]["forecast_date"], "2024-08-27");

        let (_, body) = get(app.clone(), "/analytics/forecast/hourly?forecast_date=2024-08-21").await;
        assert_eq!(body.as_array().unwrap().len(), 24);
        assert_eq!(body[0]["forecast_type"], "hourly_00");

        let (_, body) = get(app, "/analytics/hourly-breakdown?target_date=2024-08-19&days_back=1").await;
        assert_eq!(body.as_array().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn empty_cache_returns_empty_lists() {
        let (app, _) = app().await;
        for uri in [
            "/analytics/daily-summary?start_date=2024-01-01&end_date=2024-01-31",
            "/analytics/top-items?limit=3",
        ] {
            let (status, body) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, Value::Array(Vec::new()), "{uri}");
        }
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let (app, _) = app().await;
        let (status, _) = get(app, "/analytics/daily-summary?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
