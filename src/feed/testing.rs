//! Scripted `RatesApi` double for controller tests.

use crate::core::rates::{HistoricalPoint, LatestRates, RatesApi};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) struct Step<T> {
    delay: Duration,
    outcome: Option<T>,
}

pub(crate) fn rates_step(delay_secs: u64, rates: &[(&str, f64)]) -> Step<LatestRates> {
    Step {
        delay: Duration::from_secs(delay_secs),
        outcome: Some(LatestRates {
            rates: rates
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            last_updated: None,
        }),
    }
}

pub(crate) fn history_step(delay_secs: u64, points: &[(&str, f64)]) -> Step<Vec<HistoricalPoint>> {
    Step {
        delay: Duration::from_secs(delay_secs),
        outcome: Some(
            points
                .iter()
                .map(|(date, rate)| HistoricalPoint {
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                    rate: *rate,
                })
                .collect(),
        ),
    }
}

pub(crate) fn failing<T>(delay_secs: u64) -> Step<T> {
    Step {
        delay: Duration::from_secs(delay_secs),
        outcome: None,
    }
}

/// Replays queued responses per request key and reports every call it receives.
pub(crate) struct ScriptedApi {
    rates: Mutex<HashMap<String, VecDeque<Step<LatestRates>>>>,
    history: Mutex<HashMap<String, VecDeque<Step<Vec<HistoricalPoint>>>>>,
    calls: mpsc::UnboundedSender<String>,
}

impl ScriptedApi {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let api = ScriptedApi {
            rates: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
            calls,
        };
        (Arc::new(api), rx)
    }

    pub(crate) fn push_rates(&self, base: &str, step: Step<LatestRates>) {
        self.rates
            .lock()
            .unwrap()
            .entry(base.to_string())
            .or_default()
            .push_back(step);
    }

    /// Queues a history response for a `CURRENCY/BASE` key.
    pub(crate) fn push_history(&self, pair: &str, step: Step<Vec<HistoricalPoint>>) {
        self.history
            .lock()
            .unwrap()
            .entry(pair.to_string())
            .or_default()
            .push_back(step);
    }
}

async fn play<T>(step: Option<Step<T>>) -> Result<T> {
    let step = step.ok_or_else(|| anyhow!("No scripted response"))?;
    tokio::time::sleep(step.delay).await;
    step.outcome.ok_or_else(|| anyhow!("Scripted failure"))
}

#[async_trait]
impl RatesApi for ScriptedApi {
    async fn fetch_rates(&self, base: &str) -> Result<LatestRates> {
        let _ = self.calls.send(format!("rates/{base}"));
        let step = self
            .rates
            .lock()
            .unwrap()
            .get_mut(base)
            .and_then(VecDeque::pop_front);
        play(step).await
    }

    async fn fetch_history(
        &self,
        currency: &str,
        base: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>> {
        let _ = self
            .calls
            .send(format!("historical/{currency}/{base}/{days}"));
        let step = self
            .history
            .lock()
            .unwrap()
            .get_mut(&format!("{currency}/{base}"))
            .and_then(VecDeque::pop_front);
        play(step).await
    }
}
