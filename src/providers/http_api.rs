use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};

use crate::core::rates::{HistoricalPoint, LatestRates, RatesApi};

/// Client for the currency backend's REST API.
///
/// Requests carry no timeout of their own; callers bound them.
pub struct HttpRatesApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRatesApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxwatch/1.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpRatesApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} URL: {}", response.status(), url));
        }

        response
            .text()
            .await
            .context("Failed to get response text")
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoricalRateItem {
    date: String,
    rate: f64,
}

fn parse_api_date(date_str: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|timestamp| timestamp.date())
        .with_context(|| format!("Failed to parse date: {date_str}"))
}

#[async_trait]
impl RatesApi for HttpRatesApi {
    #[instrument(name = "RatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<LatestRates> {
        let url = format!("{}/api/currency/rates/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let text = self.get_text(&url).await?;
        let data: RatesResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse rates response");
            anyhow!("Failed to parse JSON response for base {}: {}", base, e)
        })?;

        debug!(count = data.rates.len(), "Received exchange rates");
        Ok(LatestRates {
            rates: data.rates,
            last_updated: data.last_updated,
        })
    }

    #[instrument(
        name = "HistoryFetch",
        skip(self),
        fields(currency = %currency, base = %base, days = days)
    )]
    async fn fetch_history(
        &self,
        currency: &str,
        base: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>> {
        let url = format!(
            "{}/api/currency/historical/{}/{}/{}",
            self.base_url, currency, base, days
        );
        debug!("Requesting historical rates from {}", url);

        let text = self.get_text(&url).await?;
        let items: Vec<HistoricalRateItem> = serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse historical response");
            anyhow!(
                "Failed to parse JSON response for {}/{}: {}",
                currency,
                base,
                e
            )
        })?;

        let mut points = Vec::with_capacity(items.len());
        for item in items {
            let date = parse_api_date(&item.date)?;
            if !(item.rate.is_finite() && item.rate > 0.0) {
                warn!(date = %date, rate = item.rate, "Dropping invalid historical rate");
                continue;
            }
            points.push(HistoricalPoint {
                date,
                rate: item.rate,
            });
        }
        Ok(points)
    }
}
