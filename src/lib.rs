pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::value::ValueOptions;
use crate::core::config::{API_KEY_ENV, AppConfig};
use crate::providers::yahoo_rapidapi::YahooRapidApiProvider;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub enum AppCommand {
    Tickers,
    Value(ValueOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Intrinsic value calculator starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Tickers => cli::tickers::run(&config),
        AppCommand::Value(options) => {
            let yahoo = &config.providers.yahoo;
            let api_key = config.api_key().with_context(|| {
                format!("No RapidAPI key configured; set {API_KEY_ENV} or providers.yahoo.api_key")
            })?;
            let provider = YahooRapidApiProvider::new(&yahoo.base_url, &yahoo.host, &api_key);
            cli::value::run(&config, &provider, &options).await
        }
    }
}
