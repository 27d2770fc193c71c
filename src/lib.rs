//! A weather bot for Meshtastic mesh networks.
//!
//! Forecasts and alerts come from api.weather.gov and are rendered into
//! replies small enough for a LoRa text message.

pub mod alerts;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod duty;
pub mod nws;
pub mod report;
pub mod router;
pub mod scheduler;
pub mod transport;
pub mod units;
pub mod weather;
