use super::{history, ui};
use crate::core::config::AppConfig;
use crate::core::currency::normalize_code;
use crate::core::format::format_rate;
use crate::core::rates::{FetchStatus, RatesApi};
use crate::feed::{HistoricalSeriesFetcher, RateFeedController, RateStatus};
use anyhow::{Context, Result, bail};
use chrono::Local;
use comfy_table::Cell;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::debug;

/// A line typed by the user while the feed is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Retry,
    Base(String),
    History(String),
    Close,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();
    if parts.next().is_some() {
        bail!("Too many arguments: {}", line.trim());
    }

    let command = match (name.to_ascii_lowercase().as_str(), argument) {
        ("r" | "retry", None) => Command::Retry,
        ("b" | "base", Some(code)) => Command::Base(normalize_code(code)?),
        ("b" | "base", None) => bail!("Usage: b CODE"),
        ("h" | "history", Some(code)) => Command::History(normalize_code(code)?),
        ("h" | "history", None) => bail!("Usage: h CODE"),
        ("c" | "close", None) => Command::Close,
        ("?" | "help", None) => Command::Help,
        ("q" | "quit" | "exit", None) => Command::Quit,
        _ => bail!("Unknown command: {}", line.trim()),
    };
    Ok(Some(command))
}

pub fn help_text() -> String {
    [
        "Commands:",
        "  r         retry fetching rates now",
        "  b CODE    switch the base currency",
        "  h CODE    show the history of CODE against the base currency",
        "  c         close the history",
        "  ?         show this list",
        "  q         quit",
    ]
    .join("\n")
}

/// Renders the current state of the rate feed.
pub fn render_rates(status: &RateStatus, base: &str) -> String {
    match status {
        FetchStatus::Idle => ui::style_text("Waiting for the first update...", ui::StyleType::Subtle),
        FetchStatus::Loading => ui::style_text(
            &format!("Loading exchange rates for {base}..."),
            ui::StyleType::Subtle,
        ),
        FetchStatus::Failure(message) => format!(
            "{}\n{}",
            ui::style_text(message, ui::StyleType::Error),
            ui::style_text("Type 'r' to retry.", ui::StyleType::Subtle)
        ),
        FetchStatus::Success(snapshot) => {
            let title = format!("Exchange rates (base: {})", snapshot.base);
            let updated = snapshot
                .captured_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S");
            let mut out = format!(
                "\n{}\n{} {}\n",
                ui::style_text(&title, ui::StyleType::Title),
                ui::style_text("Last updated:", ui::StyleType::Label),
                updated
            );
            if let Some(source_updated) = &snapshot.source_updated {
                out.push_str(&ui::style_text(
                    &format!("Source data as of {source_updated}\n"),
                    ui::StyleType::Subtle,
                ));
            }

            if snapshot.is_empty() {
                out.push_str(&ui::style_text("No rates available.", ui::StyleType::Subtle));
                return out;
            }

            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);
            for (code, rate) in snapshot.iter() {
                table.add_row(vec![Cell::new(code), ui::rate_cell(format_rate(rate))]);
            }
            out.push_str(&table.to_string());
            out
        }
    }
}

/// Applies a command; returns false when the user asked to quit.
fn apply_command(
    command: Command,
    feed: &RateFeedController,
    history: &mut HistoricalSeriesFetcher,
) -> bool {
    match command {
        Command::Retry => {
            feed.retry();
        }
        Command::Base(code) => {
            if feed.set_base_currency(&code) {
                // An open history follows the new base
                if let Some(currency) = history.selection().map(|s| s.currency.clone()) {
                    history.activate(&currency, &code);
                }
            } else {
                println!(
                    "{}",
                    ui::style_text(
                        &format!("Base currency is already {code}"),
                        ui::StyleType::Subtle
                    )
                );
            }
        }
        Command::History(code) => history.activate(&code, &feed.base_currency()),
        Command::Close => history.deactivate(),
        Command::Help => println!("{}", help_text()),
        Command::Quit => return false,
    }
    true
}

/// Starts the feed and renders its first status, marking it as seen on `rx`.
fn start_feed(
    feed: &mut RateFeedController,
    rx: &mut watch::Receiver<RateStatus>,
    base: &str,
) -> String {
    feed.start(base);
    let status = rx.borrow_and_update().clone();
    render_rates(&status, base)
}

/// Runs the live rate view until the user quits or presses Ctrl-C.
pub async fn run(api: Arc<dyn RatesApi>, config: &AppConfig, base: &str) -> Result<()> {
    let mut feed = RateFeedController::new(Arc::clone(&api), config.into());
    let mut history = HistoricalSeriesFetcher::new(api, config.into());
    let mut rates_rx = feed.subscribe();
    let mut history_rx = history.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("{}", help_text());
    println!("{}", start_feed(&mut feed, &mut rates_rx, base));

    loop {
        tokio::select! {
            changed = rates_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = rates_rx.borrow_and_update().clone();
                ui::print_separator();
                println!("{}", render_rates(&status, &feed.base_currency()));
            }
            changed = history_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = history_rx.borrow_and_update().clone();
                println!("{}", history::render_status(&status));
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    None => {
                        debug!("stdin closed, waiting for Ctrl-C");
                        stdin_open = false;
                    }
                    Some(line) => match parse_command(&line) {
                        Ok(Some(command)) => {
                            if !apply_command(command, &feed, &mut history) {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                    },
                }
            }
            _ = &mut ctrl_c => {
                debug!("Interrupted");
                break;
            }
        }
    }

    history.deactivate();
    feed.stop();
    Ok(())
}
