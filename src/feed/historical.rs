use crate::core::config::AppConfig;
use crate::core::rates::{FetchStatus, HistoricalSeries, RatesApi, Selection};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

pub const HISTORY_FAILURE_MESSAGE: &str = "Failed to load historical data";

pub type HistoryStatus = FetchStatus<HistoricalSeries>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySettings {
    pub days: u32,
    pub request_timeout: Duration,
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings {
            days: 180,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&AppConfig> for HistorySettings {
    fn from(config: &AppConfig) -> Self {
        HistorySettings {
            days: config.history_days,
            request_timeout: config.history_timeout(),
        }
    }
}

/// Single-shot fetch of the historical series for the selected currency pair.
///
/// Every activation bumps a generation counter; a response is applied only
/// while its generation is still current, so nothing from a closed or
/// replaced selection ever reaches the published status.
pub struct HistoricalSeriesFetcher {
    api: Arc<dyn RatesApi>,
    settings: HistorySettings,
    status: Arc<watch::Sender<HistoryStatus>>,
    generation: Arc<AtomicU64>,
    selection: Option<Selection>,
    task: Option<JoinHandle<()>>,
}

impl HistoricalSeriesFetcher {
    pub fn new(api: Arc<dyn RatesApi>, settings: HistorySettings) -> Self {
        let (status, _) = watch::channel(FetchStatus::Idle);
        Self {
            api,
            settings,
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
            selection: None,
            task: None,
        }
    }

    /// Starts fetching the series for `currency` against `base`, replacing
    /// any previous selection.
    pub fn activate(&mut self, currency: &str, base: &str) {
        self.deactivate();

        let selection = Selection {
            currency: currency.to_string(),
            base: base.to_string(),
        };
        let mut generation = 0;
        self.status.send_modify(|status| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = FetchStatus::Loading;
        });
        info!(
            currency = %selection.currency,
            base = %selection.base,
            days = self.settings.days,
            "Loading historical series"
        );

        self.task = Some(tokio::spawn(fetch_series(
            Arc::clone(&self.api),
            self.settings,
            selection.clone(),
            Arc::clone(&self.status),
            Arc::clone(&self.generation),
            generation,
        )));
        self.selection = Some(selection);
    }

    /// Clears the selection and drops any pending result.
    pub fn deactivate(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.status.send_if_modified(|status| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if matches!(status, FetchStatus::Idle) {
                false
            } else {
                *status = FetchStatus::Idle;
                true
            }
        });
        if let Some(selection) = self.selection.take() {
            debug!(
                currency = %selection.currency,
                base = %selection.base,
                "Historical selection closed"
            );
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn status(&self) -> HistoryStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryStatus> {
        self.status.subscribe()
    }
}

impl Drop for HistoricalSeriesFetcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn fetch_series(
    api: Arc<dyn RatesApi>,
    settings: HistorySettings,
    selection: Selection,
    status: Arc<watch::Sender<HistoryStatus>>,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    let Selection { currency, base } = selection;
    let outcome = time::timeout(
        settings.request_timeout,
        api.fetch_history(&currency, &base, settings.days),
    )
    .await;

    let next = match outcome {
        Ok(Ok(points)) => {
            info!(currency = %currency, base = %base, points = points.len(), "Historical series loaded");
            FetchStatus::Success(HistoricalSeries {
                currency,
                base,
                points,
            })
        }
        Ok(Err(e)) => {
            error!(error = %e, currency = %currency, base = %base, "Error fetching historical data");
            FetchStatus::Failure(HISTORY_FAILURE_MESSAGE.to_string())
        }
        Err(_) => {
            error!(
                currency = %currency,
                base = %base,
                timeout = ?settings.request_timeout,
                "Historical request timed out"
            );
            FetchStatus::Failure(HISTORY_FAILURE_MESSAGE.to_string())
        }
    };

    let applied = status.send_if_modified(|status| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        *status = next;
        true
    });
    if !applied {
        debug!(generation, "Discarding historical response for a closed selection");
    }
}
