//! Exchange rate abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Rates for one base currency as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestRates {
    pub rates: HashMap<String, f64>,
    pub last_updated: Option<String>,
}

/// An immutable capture of current rates for a base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub captured_at: DateTime<Utc>,
    pub source_updated: Option<String>,
}

impl RateSnapshot {
    /// Builds a snapshot, dropping any rate that is not positive and finite.
    pub fn new(base: &str, latest: LatestRates, captured_at: DateTime<Utc>) -> Self {
        let rates = latest
            .rates
            .into_iter()
            .filter(|(code, rate)| {
                let valid = rate.is_finite() && *rate > 0.0;
                if !valid {
                    warn!(currency = %code, rate = %rate, base = %base, "Dropping invalid rate");
                }
                valid
            })
            .collect();

        Self {
            base: base.to_string(),
            rates,
            captured_at,
            source_updated: latest.last_updated,
        }
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rates ordered by currency code.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Rates of `currency` against `base`, in the order the backend returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub currency: String,
    pub base: String,
    pub points: Vec<HistoricalPoint>,
}

impl HistoricalSeries {
    pub fn first(&self) -> Option<&HistoricalPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&HistoricalPoint> {
        self.points.last()
    }

    pub fn min(&self) -> Option<&HistoricalPoint> {
        self.points.iter().min_by(|a, b| a.rate.total_cmp(&b.rate))
    }

    pub fn max(&self) -> Option<&HistoricalPoint> {
        self.points.iter().max_by(|a, b| a.rate.total_cmp(&b.rate))
    }

    /// Percentage change from the first to the last point of the window.
    pub fn change_percent(&self) -> Option<f64> {
        let first = self.first()?.rate;
        let last = self.last()?.rate;
        if first > 0.0 {
            Some(((last - first) / first) * 100.0)
        } else {
            None
        }
    }
}

/// The currency pair the user wants charted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub currency: String,
    pub base: String,
}

/// Request lifecycle of a fetch, published to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchStatus<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Failure(String),
}

impl<T> FetchStatus<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchStatus::Loading)
    }

    /// True once a fetch has either succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchStatus::Success(_) | FetchStatus::Failure(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchStatus::Success(data) => Some(data),
            _ => None,
        }
    }
}

#[async_trait]
pub trait RatesApi: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<LatestRates>;

    async fn fetch_history(
        &self,
        currency: &str,
        base: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, rate: f64) -> HistoricalPoint {
        HistoricalPoint {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            rate,
        }
    }

    #[test]
    fn test_snapshot_drops_invalid_rates() {
        let latest = LatestRates {
            rates: HashMap::from([
                ("EUR".to_string(), 0.92),
                ("BAD".to_string(), 0.0),
                ("NEG".to_string(), -1.5),
                ("NAN".to_string(), f64::NAN),
            ]),
            last_updated: Some("2024-05-01".to_string()),
        };

        let snapshot = RateSnapshot::new("USD", latest, Utc::now());

        assert_eq!(snapshot.base, "USD");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.rate("EUR"), Some(0.92));
        assert!(snapshot.rate("BAD").is_none());
        assert_eq!(snapshot.source_updated.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_snapshot_iterates_sorted_by_code() {
        let latest = LatestRates {
            rates: HashMap::from([
                ("JPY".to_string(), 155.2),
                ("AUD".to_string(), 1.51),
                ("EUR".to_string(), 0.92),
            ]),
            last_updated: None,
        };

        let snapshot = RateSnapshot::new("USD", latest, Utc::now());
        let codes: Vec<&str> = snapshot.iter().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["AUD", "EUR", "JPY"]);
    }

    #[test]
    fn test_empty_snapshot_is_valid() {
        let snapshot = RateSnapshot::new("USD", LatestRates::default(), Utc::now());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
    }

    #[test]
    fn test_series_summary() {
        let series = HistoricalSeries {
            currency: "EUR".to_string(),
            base: "USD".to_string(),
            points: vec![
                point("2024-01-01", 0.90),
                point("2024-01-02", 0.88),
                point("2024-01-03", 0.95),
                point("2024-01-04", 0.99),
            ],
        };

        assert_eq!(series.first().unwrap().rate, 0.90);
        assert_eq!(series.last().unwrap().rate, 0.99);
        assert_eq!(series.min().unwrap().rate, 0.88);
        assert_eq!(series.max().unwrap().rate, 0.99);
        assert!((series.change_percent().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series_summary() {
        let series = HistoricalSeries {
            currency: "EUR".to_string(),
            base: "USD".to_string(),
            points: vec![],
        };
        assert!(series.first().is_none());
        assert!(series.min().is_none());
        assert!(series.change_percent().is_none());
    }

    #[test]
    fn test_fetch_status_accessors() {
        let idle: FetchStatus<u32> = FetchStatus::default();
        assert_eq!(idle, FetchStatus::Idle);
        assert!(!idle.is_terminal());
        assert!(FetchStatus::<u32>::Loading.is_loading());
        assert_eq!(FetchStatus::Success(7).data(), Some(&7));
        assert!(FetchStatus::<u32>::Failure("boom".to_string()).is_terminal());
        assert!(FetchStatus::<u32>::Failure("boom".to_string()).data().is_none());
    }
}
