//! Periodic crawl runs
//!
//! When `[crawl] schedule_interval_secs` is non-zero, a background task
//! starts a crawl every interval with the configured seeds. Each run takes
//! the batch lock the same way `POST /crawl` does; if another job holds it,
//! that tick is skipped rather than queued.

use catwalk_common::Error;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::rule_compiler::load_active_rules;
use crate::services::{CrawlController, CrawlSummary, JobKind};
use crate::AppState;

pub struct CrawlScheduler {
    state: AppState,
    period: Duration,
}

impl CrawlScheduler {
    /// `None` when scheduling is switched off
    pub fn from_state(state: AppState) -> Option<Self> {
        match state.config.crawl.schedule_interval_secs {
            0 => None,
            secs => Some(Self {
                state,
                period: Duration::from_secs(secs),
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick until `shutdown` fires. The first run comes one period after start.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.period.as_secs(), "Crawl scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.tick() => {}
                    }
                }
            }
        }

        info!("Crawl scheduler stopped");
    }

    /// One scheduled run. Returns the summary, or `None` if the run was
    /// skipped or failed.
    pub async fn tick(&self) -> Option<CrawlSummary> {
        let guard = match self.state.batch_lock.try_acquire(JobKind::Crawl) {
            Ok(guard) => guard,
            Err(Error::Conflict(message)) => {
                info!(reason = %message, "Skipping scheduled crawl");
                return None;
            }
            Err(e) => {
                error!(error = %e, "Scheduled crawl could not take the batch lock");
                return None;
            }
        };

        let active = match load_active_rules(&self.state.db, &self.state.config.filter).await {
            Ok(active) => active,
            Err(e) => {
                error!(error = %e, "Scheduled crawl could not load filter rules");
                return None;
            }
        };

        let controller = CrawlController::new(
            self.state.db.clone(),
            self.state.renderer.clone(),
            self.state.config.crawl.clone(),
        );

        match controller.run(&active.rules, guard.token()).await {
            Ok(summary) => {
                info!(
                    pages_crawled = summary.pages_crawled,
                    images_stored = summary.images_stored,
                    status = ?summary.status,
                    "Scheduled crawl finished"
                );
                Some(summary)
            }
            Err(e) => {
                error!(error = %e, "Scheduled crawl failed");
                None
            }
        }
    }
}
