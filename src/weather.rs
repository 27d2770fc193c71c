use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer};

use crate::units::direction::Compass;

/// Which upstream forecast a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Hourly,
    Daily,
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Hourly => write!(f, "hourly"),
            Horizon::Daily => write!(f, "daily"),
        }
    }
}

/// One forecast interval, as published in `properties.periods[]`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Period {
    #[serde(rename = "startTime")]
    pub start_time: DateTime<FixedOffset>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    pub temperature: f64,

    #[serde(rename = "shortForecast", default, deserialize_with = "null_as_default")]
    pub short_forecast: String,

    #[serde(rename = "windSpeed", default, deserialize_with = "null_as_default")]
    pub wind_speed: String,

    #[serde(rename = "windDirection", default, deserialize_with = "null_as_default")]
    pub wind_direction: Compass,

    #[serde(
        rename = "probabilityOfPrecipitation",
        default,
        deserialize_with = "quantity_value"
    )]
    pub precipitation_probability: Option<f64>,
}

impl Period {
    pub fn is_night(&self) -> bool {
        self.name.to_lowercase().contains("night")
    }

    pub fn rounded_temperature(&self) -> i64 {
        self.temperature.round() as i64
    }

    /// Chance of precipitation in percent; a missing value reads as zero.
    pub fn rain_chance(&self) -> i64 {
        self.precipitation_probability.unwrap_or(0.0).round() as i64
    }

    /// Leading number of `windSpeed`, e.g. `"5 to 10 mph"` gives 5.
    pub fn wind_speed_mph(&self) -> Option<i64> {
        let first = self.wind_speed.split_whitespace().next()?;
        first.parse::<f64>().ok().map(|mph| mph.round() as i64)
    }
}

#[derive(Deserialize)]
struct QuantitativeValue {
    value: Option<f64>,
}

fn quantity_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let quantity: Option<QuantitativeValue> = Option::deserialize(deserializer)?;
    Ok(quantity.and_then(|q| q.value))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A cached forecast payload for one horizon. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub periods: Vec<Period>,
}

impl WeatherSnapshot {
    /// Periods starting strictly after `now`, in feed order.
    pub fn upcoming(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Period> {
        self.periods.iter().filter(move |p| p.start_time > now)
    }
}

/// The alert currently held by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub id: String,
    pub headline: String,
    pub description: String,
}

impl AlertRecord {
    pub fn message(&self, include_description: bool) -> String {
        if include_description {
            format!("{}\nDescription: {}", self.headline, self.description)
        } else {
            self.headline.clone()
        }
    }
}
