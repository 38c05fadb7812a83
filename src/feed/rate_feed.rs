//! Polling lifecycle for current exchange rates.

use crate::core::config::AppConfig;
use crate::core::rates::{FetchStatus, RateSnapshot, RatesApi};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

pub const RATES_FAILURE_MESSAGE: &str = "Failed to fetch exchange rates. Please try again later.";

pub type RateStatus = FetchStatus<RateSnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        FeedSettings {
            refresh_interval: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for FeedSettings {
    fn from(config: &AppConfig) -> Self {
        FeedSettings {
            refresh_interval: config.refresh_interval(),
            request_timeout: config.rates_timeout(),
        }
    }
}

struct FeedState {
    api: Arc<dyn RatesApi>,
    settings: FeedSettings,
    base: Mutex<String>,
    // Sequence number of the most recently issued fetch
    issued: AtomicU64,
    stopped: AtomicBool,
    status: watch::Sender<RateStatus>,
    in_flight: Mutex<JoinSet<()>>,
}

impl FeedState {
    fn base(&self) -> String {
        self.base
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn issue_fetch(self: &Arc<Self>, reason: &'static str) -> bool {
        // Sequence allocation and the Loading transition share the channel's
        // write lock with result application and `stop`.
        let mut issued = None;
        self.status.send_if_modified(|status| {
            if self.stopped.load(Ordering::SeqCst) {
                return false;
            }
            let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            issued = Some((seq, self.base()));
            *status = FetchStatus::Loading;
            true
        });

        let Some((seq, base)) = issued else {
            debug!(reason, "Rate feed is stopped, skipping fetch");
            return false;
        };
        debug!(reason, seq, base = %base, "Issuing rate fetch");

        let state = Arc::clone(self);
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move { state.fetch(seq, base).await });
        true
    }

    async fn fetch(&self, seq: u64, base: String) {
        let outcome = time::timeout(self.settings.request_timeout, self.api.fetch_rates(&base)).await;

        let next = match outcome {
            Ok(Ok(latest)) => {
                let snapshot = RateSnapshot::new(&base, latest, Utc::now());
                info!(base = %base, count = snapshot.len(), "Exchange rates updated");
                FetchStatus::Success(snapshot)
            }
            Ok(Err(e)) => {
                error!(error = %e, base = %base, "Error fetching rates");
                FetchStatus::Failure(RATES_FAILURE_MESSAGE.to_string())
            }
            Err(_) => {
                error!(
                    base = %base,
                    timeout = ?self.settings.request_timeout,
                    "Rate request timed out"
                );
                FetchStatus::Failure(RATES_FAILURE_MESSAGE.to_string())
            }
        };

        let applied = self.status.send_if_modified(|status| {
            if self.issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            *status = next;
            true
        });
        if !applied {
            debug!(seq, base = %base, "Discarding superseded rate response");
        }
    }
}

/// Fetches current rates for a base currency on a fixed schedule and on demand.
///
/// Status changes are published on a watch channel; see [`subscribe`](Self::subscribe).
/// Only the result of the most recently issued fetch is ever applied, so a
/// slow response for an old base can't overwrite newer data. Currency codes
/// are compared as given; callers pass normalized codes.
///
/// Must be used from within a Tokio runtime. Dropping the controller stops it.
pub struct RateFeedController {
    state: Arc<FeedState>,
    timer: Option<JoinHandle<()>>,
}

impl RateFeedController {
    pub fn new(api: Arc<dyn RatesApi>, settings: FeedSettings) -> Self {
        let (status, _) = watch::channel(FetchStatus::Idle);
        let state = FeedState {
            api,
            settings,
            base: Mutex::new(String::new()),
            issued: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            status,
            in_flight: Mutex::new(JoinSet::new()),
        };

        Self {
            state: Arc::new(state),
            timer: None,
        }
    }

    /// Fetches immediately, then again every refresh interval until stopped.
    /// Calling it on a running feed restarts the schedule.
    pub fn start(&mut self, base: &str) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.state.stopped.store(false, Ordering::SeqCst);
        *self
            .state
            .base
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = base.to_string();

        let period = self.state.settings.refresh_interval;
        info!(base, interval = ?period, "Starting rate feed");
        self.state.issue_fetch("start");

        let state = Arc::clone(&self.state);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.issue_fetch("interval");
            }
        }));
    }

    /// Switches to a new base currency and fetches right away. Returns false
    /// if the base is unchanged or the feed is stopped.
    pub fn set_base_currency(&self, new_base: &str) -> bool {
        {
            let mut base = self
                .state
                .base
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *base == new_base {
                debug!(base = new_base, "Base currency unchanged");
                return false;
            }
            *base = new_base.to_string();
        }
        info!(base = new_base, "Base currency changed");
        self.state.issue_fetch("base-change")
    }

    /// Fetches right away with the current base. The schedule keeps its phase.
    pub fn retry(&self) -> bool {
        self.state.issue_fetch("retry")
    }

    /// Cancels the schedule and any in-flight fetch.
    pub fn stop(&mut self) {
        self.state.status.send_if_modified(|status| {
            self.state.stopped.store(true, Ordering::SeqCst);
            self.state.issued.fetch_add(1, Ordering::SeqCst);
            if status.is_loading() {
                *status = FetchStatus::Idle;
                true
            } else {
                false
            }
        });

        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!("Rate feed stopped");
        }
        self.state
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn base_currency(&self) -> String {
        self.state.base()
    }

    pub fn status(&self) -> RateStatus {
        self.state.status.borrow().clone()
    }

    /// The latest snapshot, present only while the status is Success.
    pub fn current_rates(&self) -> Option<RateSnapshot> {
        self.state.status.borrow().data().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<RateStatus> {
        self.state.status.subscribe()
    }
}

impl Drop for RateFeedController {
    fn drop(&mut self) {
        self.stop();
    }
}
