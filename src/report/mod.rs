//! Text renderings of the cached forecasts, sized for mesh replies.
//!
//! Formatters never fail: missing data or an empty result turns into one of
//! the user-visible error strings below.

use chrono::{DateTime, Utc};

use crate::cache::WeatherDataCache;
use crate::chunker;

pub mod daily;
pub mod hourly;

pub const FETCH_ERROR: &str = "Error: Unable to fetch weather data";
pub const PROCESS_ERROR: &str = "Error: Could not process weather data";

pub const RAIN_GLYPH: &str = "💧";
const THUNDERSTORM_GLYPH: &str = "⛈️";
const DEFAULT_GLYPH: &str = "🌡️";

// First match wins, so order matters.
const FORECAST_GLYPHS: [(&str, &str); 12] = [
    ("clear", "🌙"),
    ("sunny", "☀️"),
    ("partly sunny", "🌤️"),
    ("mostly sunny", "🌤️"),
    ("partly cloudy", "⛅"),
    ("mostly cloudy", "🌥️"),
    ("cloudy", "☁️"),
    ("rain", "🌧️"),
    ("showers", "🌧️"),
    ("thunderstorm", THUNDERSTORM_GLYPH),
    ("snow", "🌨️"),
    ("fog", "🌫️"),
];

/// Maps NWS short forecast text to a single glyph.
pub fn forecast_glyph(short_forecast: &str) -> &'static str {
    let forecast = short_forecast.to_lowercase();
    // "Showers And Thunderstorms" would otherwise hit the rain entries first
    if forecast.contains("thunderstorm") {
        return THUNDERSTORM_GLYPH;
    }
    FORECAST_GLYPHS
        .iter()
        .find(|(key, _)| forecast.contains(*key))
        .map_or(DEFAULT_GLYPH, |&(_, glyph)| glyph)
}

/// Every report the bot can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Temperature,
    Rain,
    Wind,
    Hourly,
    TwoDay,
    FourDay,
    FiveDay,
    SevenDay,
}

impl Report {
    /// Renders the report as the sequence of messages to transmit, already
    /// paginated where the report spans more than one message.
    pub fn render(self, weather: &WeatherDataCache, now: DateTime<Utc>) -> Vec<String> {
        match self {
            Report::Temperature => vec![hourly::temperature(weather.hourly_at(now).as_deref(), now)],
            Report::Rain => vec![hourly::rain(weather.hourly_at(now).as_deref(), now)],
            Report::Wind => match hourly::wind(weather.hourly_at(now).as_deref(), now) {
                Ok(lines) => chunker::split(&lines.join("\n"), 180, "Wind", 1, None),
                Err(e) => vec![e],
            },
            Report::Hourly => {
                let text = hourly::outlook(weather.hourly_at(now).as_deref(), now);
                chunker::split(&text, chunker::DEFAULT_MAX_BYTES, "Hourly", 1, None)
            }
            Report::TwoDay => vec![daily::two_day(weather.daily_at(now).as_deref())],
            Report::FourDay => match daily::outlook(weather.daily_at(now).as_deref(), 4) {
                Ok(lines) => vec![lines.join("\n")],
                Err(e) => vec![e],
            },
            Report::FiveDay => match daily::five_day(weather.daily_at(now).as_deref()) {
                Ok(paragraphs) => {
                    let bodies = chunker::pack(
                        paragraphs.iter().map(String::as_str),
                        "\n\n",
                        chunker::DEFAULT_MAX_BYTES,
                    );
                    // a blank line separates the page header from the first paragraph
                    let bodies: Vec<String> = bodies.iter().map(|body| format!("\n{body}")).collect();
                    chunker::paginate(&bodies, "5-Day", 1, None)
                }
                Err(e) => vec![e],
            },
            Report::SevenDay => match daily::outlook(weather.daily_at(now).as_deref(), 7) {
                Ok(lines) => {
                    chunker::split(&lines.join("\n"), chunker::DEFAULT_MAX_BYTES, "7day", 1, None)
                }
                Err(e) => vec![e],
            },
        }
    }
}
