//! Core types shared by the client and the command line

pub mod config;
pub mod error;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use error::{AmberError, Result};
pub use price::{ForecastEntry, PriceBand, PriceReading};
