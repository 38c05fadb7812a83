pub mod cli;
pub mod core;
pub mod feed;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::currency::normalize_code;
use crate::core::rates::RatesApi;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rates {
        base: Option<String>,
    },
    History {
        currency: String,
        base: Option<String>,
    },
}

fn resolve_base(base: Option<&str>, config: &AppConfig) -> Result<String> {
    match base {
        Some(code) => normalize_code(code),
        None => Ok(config.base_currency.clone()),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let api: Arc<dyn RatesApi> = Arc::new(providers::HttpRatesApi::new(&config.api.base_url)?);

    match command {
        AppCommand::Rates { base } => {
            let base = resolve_base(base.as_deref(), &config)?;
            cli::rates::run(api, &config, &base).await
        }
        AppCommand::History { currency, base } => {
            let currency = normalize_code(&currency)?;
            let base = resolve_base(base.as_deref(), &config)?;
            cli::history::run(api, &config, &currency, &base).await
        }
    }
}
