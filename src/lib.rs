pub mod cli;
pub mod core;
pub mod models;
pub mod providers;

use crate::cli::predict::PredictRequest;
use crate::core::config::AppConfig;
use crate::core::{CleanOutcome, cleaning};
use crate::providers::tgju::TgjuRateProvider;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that need a loaded configuration.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Rate,
    Clean,
    Describe,
    Predict(PredictRequest),
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

async fn clean_dataset(config: &AppConfig, provider: &TgjuRateProvider) -> Result<CleanOutcome> {
    cleaning::clean(&config.dataset_path, provider, config.cache_layout).await
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("hpx starting...");
    let config = load_config(config_path)?;

    let rate_provider =
        TgjuRateProvider::new(config.tgju_base_url()).with_fallback_rate(config.fallback_rate);

    match command {
        AppCommand::Rate => cli::rate::run(&rate_provider).await,
        AppCommand::Clean => {
            let outcome = clean_dataset(&config, &rate_provider).await?;
            cli::clean::run(&outcome);
            Ok(())
        }
        AppCommand::Describe => {
            let outcome = clean_dataset(&config, &rate_provider).await?;
            cli::describe::run(&outcome.dataset);
            Ok(())
        }
        AppCommand::Predict(request) => {
            let outcome = clean_dataset(&config, &rate_provider).await?;
            cli::predict::run(&outcome.dataset, &config.models, &request)
        }
    }
}
