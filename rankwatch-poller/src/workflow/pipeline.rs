//! Pipeline orchestrator
//!
//! One `run()` covers the whole acquire/resolve/diff/notify flow: iterate
//! the tracked products in registration order, resolve each one with
//! per-item failure isolation, persist the accumulated observations as a
//! single batch, then deliver the digest best-effort.
//!
//! The orchestrator is the sole writer of observations and the sole owner
//! of a run's lifecycle. It assumes single-flight invocation; the external
//! trigger enforces that.

use crate::services::category_names::CategoryNameCache;
use crate::services::notifier;
use crate::services::provider::RankingProvider;
use crate::services::rank_resolver::RankResolver;
use crate::services::slack::NotificationChannel;
use chrono::{Days, Utc};
use rankwatch_common::db::{history, products};
use rankwatch_common::{Result, RunReport};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct Pipeline<P: RankingProvider, C: NotificationChannel> {
    db: SqlitePool,
    /// `None` when no credential is configured; the run is then a valid
    /// idle state and returns an empty report before any work
    provider: Option<P>,
    channel: C,
}

impl<P: RankingProvider, C: NotificationChannel> Pipeline<P, C> {
    pub fn new(db: SqlitePool, provider: Option<P>, channel: C) -> Self {
        Self {
            db,
            provider,
            channel,
        }
    }

    /// Execute one run
    ///
    /// Per-item resolution failures are recorded on the report and never
    /// abort the run. A failed batch append is surfaced on the report
    /// without discarding the in-memory results. `Err` is returned only
    /// when the tracked-product set itself cannot be loaded.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let idle = |reason: &str| {
            info!(run_id = %run_id, "{}, idle run", reason);
            RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                succeeded: Vec::new(),
                failed_asins: Vec::new(),
                persistence_error: None,
            }
        };

        let Some(provider) = &self.provider else {
            return Ok(idle("No provider credential configured"));
        };

        let tracked = products::list(&self.db).await?;
        if tracked.is_empty() {
            return Ok(idle("No tracked products"));
        }

        info!(run_id = %run_id, products = tracked.len(), "Run started");

        let names = CategoryNameCache::new(provider);
        let resolver = RankResolver::new(provider, &names);

        let mut succeeded = Vec::new();
        let mut failed_asins = Vec::new();

        for product in &tracked {
            match resolver.resolve(&product.asin, started_at).await {
                Ok(resolved) => {
                    info!(
                        asin = %product.asin,
                        title = %resolved.title,
                        observations = resolved.observations.len(),
                        "Resolved"
                    );
                    // Stored display name follows the provider title
                    if let Err(e) =
                        products::update_title(&self.db, &product.asin, &resolved.title).await
                    {
                        warn!(asin = %product.asin, error = %e, "Title write-back failed");
                    }
                    succeeded.extend(resolved.observations);
                }
                Err(e) => {
                    warn!(asin = %product.asin, error = %e, "Resolution failed, continuing");
                    failed_asins.push(product.asin.clone());
                }
            }
        }

        let mut persistence_error = None;
        if !succeeded.is_empty() {
            if let Err(e) = history::append(&self.db, &succeeded).await {
                error!(error = %e, "Batch append failed; run results kept in memory");
                persistence_error = Some(e.to_string());
            }

            let run_date = started_at.date_naive();
            let window_start = run_date
                .checked_sub_days(Days::new(2))
                .unwrap_or(run_date);
            let history = match history::query_since(&self.db, window_start).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(error = %e, "History load failed, digest will carry no deltas");
                    Vec::new()
                }
            };

            notifier::notify(&self.channel, &succeeded, &history, run_date).await;
        }

        let finished_at = Utc::now();
        info!(
            run_id = %run_id,
            succeeded = tracked.len() - failed_asins.len(),
            failed = failed_asins.len(),
            observations = succeeded.len(),
            "Run complete"
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at,
            succeeded,
            failed_asins,
            persistence_error,
        })
    }
}
