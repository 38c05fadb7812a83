use super::ui;
use crate::core::config::AppConfig;
use crate::core::format::format_rate;
use crate::core::rates::{FetchStatus, HistoricalPoint, HistoricalSeries, RatesApi};
use crate::feed::{HistoricalSeriesFetcher, HistoryStatus};
use anyhow::{Context, Result, anyhow};
use comfy_table::Cell;
use std::sync::Arc;

/// Renders the summary and the full series of a loaded history.
pub fn render_series(series: &HistoricalSeries) -> String {
    let title = format!(
        "Historical rates for {} (base: {})",
        series.currency, series.base
    );
    let mut out = format!("\n{}\n", ui::style_text(&title, ui::StyleType::Title));

    if series.points.is_empty() {
        out.push_str(&ui::style_text(
            "No historical data available.",
            ui::StyleType::Subtle,
        ));
        return out;
    }

    let mut summary = ui::new_styled_table();
    summary.set_header(vec![
        ui::header_cell("Start"),
        ui::header_cell("End"),
        ui::header_cell("Low"),
        ui::header_cell("High"),
        ui::header_cell("Change"),
    ]);
    let rate_of = |point: Option<&HistoricalPoint>| {
        point.map_or_else(|| "N/A".to_string(), |p| format_rate(p.rate))
    };
    summary.add_row(vec![
        ui::rate_cell(rate_of(series.first())),
        ui::rate_cell(rate_of(series.last())),
        ui::rate_cell(rate_of(series.min())),
        ui::rate_cell(rate_of(series.max())),
        series
            .change_percent()
            .map_or_else(|| Cell::new("N/A"), ui::change_cell),
    ]);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Rate")]);
    for point in &series.points {
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d")),
            ui::rate_cell(format_rate(point.rate)),
        ]);
    }

    out.push_str(&format!("{summary}\n{table}"));
    out
}

/// Renders a status change of the history panel.
pub fn render_status(status: &HistoryStatus) -> String {
    match status {
        FetchStatus::Idle => ui::style_text("History closed.", ui::StyleType::Subtle),
        FetchStatus::Loading => ui::style_text("Loading chart...", ui::StyleType::Subtle),
        FetchStatus::Success(series) => render_series(series),
        FetchStatus::Failure(message) => format!(
            "{}\n{}",
            ui::style_text(message, ui::StyleType::Error),
            ui::style_text("Type 'c' to close.", ui::StyleType::Subtle)
        ),
    }
}

/// Fetches and prints the history of one currency pair.
pub async fn run(
    api: Arc<dyn RatesApi>,
    config: &AppConfig,
    currency: &str,
    base: &str,
) -> Result<()> {
    let mut fetcher = HistoricalSeriesFetcher::new(api, config.into());
    let mut rx = fetcher.subscribe();
    fetcher.activate(currency, base);

    let pb = ui::new_spinner(&format!(
        "Loading {}-day history for {currency}/{base}...",
        config.history_days
    ));
    let status = rx
        .wait_for(|status| status.is_terminal())
        .await
        .context("History fetcher closed unexpectedly")?
        .clone();
    pb.finish_and_clear();
    fetcher.deactivate();

    match status {
        FetchStatus::Success(series) => {
            println!("{}", render_series(&series));
            Ok(())
        }
        FetchStatus::Failure(message) => Err(anyhow!(message)),
        _ => Err(anyhow!("History fetch ended without a result")),
    }
}
