//! 24-hour reports built from the hourly forecast. Only periods that start
//! after `now` are shown.

use chrono::{DateTime, Utc};

use super::{forecast_glyph, FETCH_ERROR, PROCESS_ERROR, RAIN_GLYPH};
use crate::units::clock::{column_label, hour_label};
use crate::weather::WeatherSnapshot;

pub const DAY_HOURS: usize = 24;
pub const OUTLOOK_HOURS: usize = 23;

fn lines_or_error(
    snapshot: Option<&WeatherSnapshot>,
    render: impl FnOnce(&WeatherSnapshot) -> Vec<String>,
) -> Result<Vec<String>, String> {
    let snapshot = snapshot.ok_or_else(|| FETCH_ERROR.to_string())?;
    let lines = render(snapshot);
    if lines.is_empty() {
        Err(PROCESS_ERROR.to_string())
    } else {
        Ok(lines)
    }
}

fn joined(result: Result<Vec<String>, String>) -> String {
    result.map_or_else(|e| e, |lines| lines.join("\n"))
}

/// `3pm:71°` per hour.
pub fn temperature(snapshot: Option<&WeatherSnapshot>, now: DateTime<Utc>) -> String {
    joined(lines_or_error(snapshot, |s| {
        s.upcoming(now)
            .take(DAY_HOURS)
            .map(|p| format!("{}:{}°", hour_label(&p.start_time), p.rounded_temperature()))
            .collect()
    }))
}

/// `3pm:20%` per hour.
pub fn rain(snapshot: Option<&WeatherSnapshot>, now: DateTime<Utc>) -> String {
    joined(lines_or_error(snapshot, |s| {
        s.upcoming(now)
            .take(DAY_HOURS)
            .map(|p| format!("{}:{}%", hour_label(&p.start_time), p.rain_chance()))
            .collect()
    }))
}

/// `3pm:12mph NW` per hour. Lines are returned unjoined so the caller can
/// paginate them; hours with an unreadable wind speed are skipped.
pub fn wind(snapshot: Option<&WeatherSnapshot>, now: DateTime<Utc>) -> Result<Vec<String>, String> {
    lines_or_error(snapshot, |s| {
        s.upcoming(now)
            .filter_map(|p| match p.wind_speed_mph() {
                Some(mph) => Some(format!(
                    "{}:{}mph {}",
                    hour_label(&p.start_time),
                    mph,
                    p.wind_direction.abbrev()
                )),
                None => {
                    log::error!("Unreadable wind speed {:?} at {}", p.wind_speed, p.start_time);
                    None
                }
            })
            .take(DAY_HOURS)
            .collect()
    })
}

/// `3pm☀️71°💧20%` per hour.
pub fn outlook(snapshot: Option<&WeatherSnapshot>, now: DateTime<Utc>) -> String {
    joined(lines_or_error(snapshot, |s| {
        s.upcoming(now)
            .take(OUTLOOK_HOURS)
            .map(|p| {
                format!(
                    "{}{}{}°{RAIN_GLYPH}{}%",
                    column_label(&p.start_time),
                    forecast_glyph(&p.short_forecast),
                    p.rounded_temperature(),
                    p.rain_chance()
                )
            })
            .collect()
    }))
}
