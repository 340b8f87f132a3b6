//! Cron-driven analysis runs.
//!
//! # Schedule Configuration
//!
//! ```json
//! {
//!   "intel": {
//!     "schedule": {
//!       "enabled": true,
//!       "cron": "0 */15 * * * *"
//!     }
//!   }
//! }
//! ```
//!
//! A failed run is logged and the next tick proceeds; runs are never retried.

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio::time::{interval, Duration};
use tracing::{error, info};

use sentinel_common::config::ScheduleConfig;

use crate::analysis::SignalAnalyzer;
use crate::error::{IntelError, Result};

/// How often the loop checks for a due run.
const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// A due time older than this is treated as missed and skipped.
const CATCH_UP_WINDOW_SECS: i64 = 60;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Disabled,
    Stopped,
    Running,
}

/// Whether `schedule` has a due time in `(last, now]` within the catch-up window.
pub fn is_due(schedule: &Schedule, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let window_start = now - chrono::Duration::seconds(CATCH_UP_WINDOW_SECS);
    let after = match last {
        Some(last) if last > window_start => last,
        _ => window_start,
    };

    schedule
        .after(&after)
        .next()
        .is_some_and(|scheduled| scheduled <= now)
}

/// Periodically invokes [`SignalAnalyzer::analyze`].
pub struct AnalysisScheduler {
    expression: String,
    /// `None` when scheduling is disabled
    schedule: Option<Schedule>,
    analyzer: Arc<SignalAnalyzer>,
    state: RwLock<SchedulerState>,
    last_execution: RwLock<Option<DateTime<Utc>>>,
    shutdown: Notify,
}

impl AnalysisScheduler {
    pub fn new(config: &ScheduleConfig, analyzer: Arc<SignalAnalyzer>) -> Result<Self> {
        let (schedule, state) = if config.enabled {
            let schedule = Schedule::from_str(&config.cron).map_err(|e| {
                IntelError::Config(sentinel_common::Error::Config(format!(
                    "Invalid analysis schedule cron {:?}: {}",
                    config.cron, e
                )))
            })?;
            info!(cron = %config.cron, "Analysis scheduler configured");
            (Some(schedule), SchedulerState::Stopped)
        } else {
            (None, SchedulerState::Disabled)
        };

        Ok(Self {
            expression: config.cron.clone(),
            schedule,
            analyzer,
            state: RwLock::new(state),
            last_execution: RwLock::new(None),
            shutdown: Notify::new(),
        })
    }

    pub async fn get_state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub async fn last_execution(&self) -> Option<DateTime<Utc>> {
        *self.last_execution.read().await
    }

    /// Wake the loop and make it exit. No-op when scheduling is disabled.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if *state == SchedulerState::Disabled {
            return;
        }
        *state = SchedulerState::Stopped;
        self.shutdown.notify_one();
        info!("Analysis scheduler stopped");
    }

    /// Next due time after now.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.as_ref()?.upcoming(Utc).next()
    }

    /// Run the scheduler loop until stopped.
    pub async fn run(&self) {
        if self.schedule.is_none() {
            info!("Analysis scheduler disabled, not starting");
            return;
        }

        *self.state.write().await = SchedulerState::Running;
        info!(cron = %self.expression, next = ?self.next_run(), "Analysis scheduler started");

        let mut check_interval = interval(CHECK_INTERVAL);
        loop {
            tokio::select! {
                _ = check_interval.tick() => {}
                _ = self.shutdown.notified() => break,
            }

            if self.get_state().await != SchedulerState::Running {
                break;
            }
            self.tick(Utc::now()).await;
        }
    }

    /// Execute one run if due at `now`. Returns whether a run was attempted.
    pub async fn tick(&self, now: DateTime<Utc>) -> bool {
        let Some(schedule) = &self.schedule else {
            return false;
        };
        let last = *self.last_execution.read().await;
        if !is_due(schedule, last, now) {
            return false;
        }

        *self.last_execution.write().await = Some(now);

        match self.analyzer.analyze().await {
            Ok(snapshot) => info!(
                run_id = %snapshot.run_id,
                processed = snapshot.intelligence_metrics.total_signals_processed,
                "Scheduled analysis completed"
            ),
            Err(e) => error!(error = %e, "Scheduled analysis failed"),
        }
        true
    }
}
