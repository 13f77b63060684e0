//! Host-facing view of the price fetcher

use crate::core::price::format_period;
use crate::core::{PriceReading, Result};
use crate::providers::{PriceFetcher, RefreshOutcome};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt::Display;
use tracing::{debug, error};

pub const ATTRIBUTION: &str = "Data provided by Amber Electric";
pub const ATTR_LAST_UPDATE: &str = "last_update";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorState {
    Unknown,
    Price(f64),
}

impl Display for SensorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorState::Unknown => f.write_str("unknown"),
            // Debug keeps the trailing `.0` on whole prices
            SensorState::Price(price) => write!(f, "{price:?}"),
        }
    }
}

pub struct AmberSensor {
    name: String,
    fetcher: PriceFetcher,
}

impl AmberSensor {
    pub fn new(name: impl Into<String>, fetcher: PriceFetcher) -> Self {
        Self {
            name: name.into(),
            fetcher,
        }
    }

    /// Builds the sensor and runs the first refresh.
    ///
    /// A rejected sign-in still yields a sensor, in the unknown state. Errors the fetcher
    /// raises are logged and returned so the caller can skip the sensor.
    pub async fn setup(
        name: impl Into<String>,
        fetcher: PriceFetcher,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut sensor = Self::new(name, fetcher);
        if let Err(e) = sensor.update(now).await {
            error!("Received error from Amber Electric: {}", e);
            return Err(e);
        }
        Ok(sensor)
    }

    pub async fn update(&mut self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let outcome = self.fetcher.refresh(now).await?;
        debug!(sensor = %self.name, ?outcome, state = %self.state(), "Sensor updated");
        Ok(outcome)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    pub fn state(&self) -> SensorState {
        self.fetcher
            .current_price()
            .map_or(SensorState::Unknown, SensorState::Price)
    }

    pub fn reading(&self) -> Option<&PriceReading> {
        self.fetcher.latest_reading()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.fetcher.last_updated()
    }

    /// The reading flattened under its wire names, plus the last update.
    pub fn attributes(&self) -> Option<Map<String, Value>> {
        let mut attributes = self.reading()?.attributes();
        if let Some(last_updated) = self.last_updated() {
            attributes.insert(
                ATTR_LAST_UPDATE.to_string(),
                Value::String(format_period(&last_updated)),
            );
        }
        Some(attributes)
    }

    pub fn fetcher(&self) -> &PriceFetcher {
        &self.fetcher
    }
}
