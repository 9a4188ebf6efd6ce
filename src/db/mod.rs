pub mod analytics;
pub mod models;
pub mod reader;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::{Config, POOL_MAX_CONNECTIONS};
use crate::error::Result;

pub use analytics::AnalyticsSession;
pub use reader::AnalyticsReader;
pub use source::SourceSession;

/// Pools for the two stores. Hands out one session of each kind per batch run.
#[derive(Clone)]
pub struct Databases {
    source: SqlitePool,
    analytics: SqlitePool,
}

impl Databases {
    pub fn new(source: SqlitePool, analytics: SqlitePool) -> Self {
        Self { source, analytics }
    }

    /// Connect both pools. The source store is opened read-only; the
    /// analytics store is created when missing.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let source_opts = SqliteConnectOptions::from_str(&cfg.source_db_url)?.read_only(true);
        let source = SqlitePoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_with(source_opts)
            .await?;
        info!("Connected to source store at {} (read-only)", cfg.source_db_url);

        let analytics_opts =
            SqliteConnectOptions::from_str(&cfg.analytics_db_url)?.create_if_missing(true);
        let analytics = SqlitePoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_with(analytics_opts)
            .await?;
        info!("Connected to analytics store at {}", cfg.analytics_db_url);

        Ok(Self { source, analytics })
    }

    /// Apply the analytics cache schema.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.analytics).await?;
        info!("Analytics tables ready");
        Ok(())
    }

    pub async fn source_session(&self) -> Result<SourceSession> {
        Ok(SourceSession::new(self.source.acquire().await?))
    }

    /// Open a transaction on the analytics store. Nothing is visible to
    /// other connections until [`AnalyticsSession::commit`].
    pub async fn analytics_session(&self) -> Result<AnalyticsSession> {
        Ok(AnalyticsSession::new(self.analytics.begin().await?))
    }

    pub fn reader(&self) -> AnalyticsReader {
        AnalyticsReader::new(self.analytics.clone(), self.source.clone())
    }
}
