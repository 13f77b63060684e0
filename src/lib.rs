pub mod cli;
pub mod core;
pub mod providers;
pub mod sensor;

use crate::core::config::AppConfig;
use crate::providers::PriceFetcher;
use crate::sensor::AmberSensor;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Price,
    Watch,
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(name = %config.name, base_url = %config.base_url, "Loaded config");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Amber Electric price sensor starting...");

    let config = load_config(config_path)?;
    let fetcher = PriceFetcher::from_config(&config).context("Failed to build price client")?;

    match command {
        AppCommand::Price => {
            let sensor = AmberSensor::setup(&config.name, fetcher, Utc::now())
                .await
                .context("Failed to set up the Amber Electric sensor")?;
            println!("{}", cli::price::display_sensor(&sensor));
            Ok(())
        }
        AppCommand::Watch => {
            // The first tick fires immediately and performs the initial refresh
            let sensor = AmberSensor::new(&config.name, fetcher);
            cli::watch::watch(sensor, config.poll_interval()).await
        }
    }
}
