//! Price reading types as reported by Amber Electric

use crate::core::error::AmberError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::str::FromStr;

/// Wire format of a period start, always UTC.
pub const PERIOD_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn parse_period(value: &str) -> Result<DateTime<Utc>, AmberError> {
    NaiveDateTime::parse_from_str(value, PERIOD_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AmberError::malformed(format!("invalid period '{value}': {e}")))
}

pub fn format_period(period: &DateTime<Utc>) -> String {
    period.format(PERIOD_FORMAT).to_string()
}

mod period_format {
    use super::*;

    pub fn serialize<S: Serializer>(period: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_period(period))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(d)?;
        parse_period(&value).map_err(de::Error::custom)
    }
}

/// Older payloads quote numbers, newer ones don't.
fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Number::deserialize(d)? {
        Number::Float(value) => Ok(value),
        Number::Text(text) => text.trim().parse().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&text), &"a decimal number")
        }),
    }
}

/// Coarse price level, reported by the service as a traffic-light color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBand {
    Low,
    Medium,
    High,
}

impl PriceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceBand::Low => "green",
            PriceBand::Medium => "yellow",
            PriceBand::High => "red",
        }
    }
}

impl Display for PriceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceBand {
    type Err = AmberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(PriceBand::Low),
            "yellow" => Ok(PriceBand::Medium),
            "red" => Ok(PriceBand::High),
            _ => Err(AmberError::malformed(format!("unknown price color: {s}"))),
        }
    }
}

impl Serialize for PriceBand {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PriceBand {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let color = String::deserialize(d)?;
        color.parse().map_err(de::Error::custom)
    }
}

/// Price for a single half-hour period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    #[serde(rename = "period", with = "period_format")]
    pub period_start: DateTime<Utc>,
    #[serde(rename = "priceKWH", deserialize_with = "number")]
    pub price_per_kwh: f64,
    #[serde(rename = "renewableInGrid", deserialize_with = "number")]
    pub renewable_fraction: f64,
    #[serde(rename = "color")]
    pub band: PriceBand,
}

/// The `data` object of a price list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReading {
    #[serde(rename = "currentPriceKWH", deserialize_with = "number")]
    pub current_price_per_kwh: f64,
    #[serde(rename = "currentRenewableInGrid", deserialize_with = "number")]
    pub current_renewable_fraction: f64,
    #[serde(rename = "currentPriceColor")]
    pub current_price_band: PriceBand,
    #[serde(rename = "currentPricePeriod", with = "period_format")]
    pub current_period_start: DateTime<Utc>,
    #[serde(rename = "forecastPrices", default)]
    pub forecast_entries: Vec<ForecastEntry>,
    #[serde(rename = "previousPrices", default)]
    pub previous_entries: Vec<ForecastEntry>,
}

impl PriceReading {
    pub fn from_data(data: Value) -> Result<Self, AmberError> {
        serde_json::from_value(data).map_err(|e| AmberError::malformed(e.to_string()))
    }

    /// All fields flattened under their wire names.
    pub fn attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
