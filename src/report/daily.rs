//! Multi-day reports built from the 12-hour (day/night) forecast.

use super::{forecast_glyph, FETCH_ERROR, PROCESS_ERROR, RAIN_GLYPH};
use crate::weather::{Period, WeatherSnapshot};

/// Combined byte ceiling for the 2-day report.
pub const TWO_DAY_CEILING: usize = 200;
const TWO_DAY_PERIODS: usize = 5;
const TWO_DAY_FALLBACK_PERIODS: usize = 3;
const FIVE_DAY_PERIODS: usize = 10;

fn describe(period: &Period) -> String {
    let temp = period.rounded_temperature();
    let forecast = &period.short_forecast;
    if period.is_night() {
        if period.name.to_lowercase().contains("tonight") {
            format!("Tonight's Low {temp}. {forecast}")
        } else {
            let day = period.name.replace(" Night", "");
            format!("{day} Night Low {temp}. {forecast}")
        }
    } else if period.name == "Today" {
        format!("Today's High {temp}. {forecast}")
    } else {
        format!("{} High {temp}. {forecast}", period.name)
    }
}

/// Five periods as paragraphs, or only the first three if that would not
/// fit in [`TWO_DAY_CEILING`] bytes.
pub fn two_day(snapshot: Option<&WeatherSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return FETCH_ERROR.to_string();
    };
    let described: Vec<String> = snapshot
        .periods
        .iter()
        .take(TWO_DAY_PERIODS)
        .map(describe)
        .collect();
    if described.is_empty() {
        return PROCESS_ERROR.to_string();
    }

    let full = described.join("\n\n");
    if full.len() > TWO_DAY_CEILING {
        let keep = described.len().min(TWO_DAY_FALLBACK_PERIODS);
        described[..keep].join("\n\n")
    } else {
        full
    }
}

/// Ten periods, one paragraph each, for the caller to paginate.
pub fn five_day(snapshot: Option<&WeatherSnapshot>) -> Result<Vec<String>, String> {
    let snapshot = snapshot.ok_or_else(|| FETCH_ERROR.to_string())?;
    let paragraphs: Vec<String> = snapshot
        .periods
        .iter()
        .take(FIVE_DAY_PERIODS)
        .map(describe)
        .collect();
    if paragraphs.is_empty() {
        return Err(PROCESS_ERROR.to_string());
    }
    Ok(paragraphs)
}

fn day_label(period: &Period, first: bool) -> String {
    if first {
        return if period.is_night() { "Tonight" } else { "Today" }.to_string();
    }
    period
        .name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .take(3)
        .collect()
}

/// One line per day: `Wed 💧30% ⛅ 🌙 ↑75° ↓50°`, at most `days` lines.
///
/// When the feed opens on a night period (already past sunset), the first
/// line carries only that night and the remaining periods are paired
/// day/night from there.
pub fn outlook(snapshot: Option<&WeatherSnapshot>, days: usize) -> Result<Vec<String>, String> {
    let snapshot = snapshot.ok_or_else(|| FETCH_ERROR.to_string())?;
    let Some(first) = snapshot.periods.first() else {
        return Err(PROCESS_ERROR.to_string());
    };

    let mut lines = Vec::with_capacity(days);
    let starts_with_night = first.is_night();
    let paired = if starts_with_night {
        lines.push(format!(
            "{} {RAIN_GLYPH}{}% ❌ {} ❌ ↓{}°",
            day_label(first, true),
            first.rain_chance(),
            forecast_glyph(&first.short_forecast),
            first.rounded_temperature()
        ));
        &snapshot.periods[1..]
    } else {
        &snapshot.periods[..]
    };

    for (i, pair) in paired.chunks_exact(2).enumerate() {
        if lines.len() >= days {
            break;
        }
        let (day, night) = (&pair[0], &pair[1]);
        lines.push(format!(
            "{} {RAIN_GLYPH}{}% {} {} ↑{}° ↓{}°",
            day_label(day, !starts_with_night && i == 0),
            day.rain_chance().max(night.rain_chance()),
            forecast_glyph(&day.short_forecast),
            forecast_glyph(&night.short_forecast),
            day.rounded_temperature(),
            night.rounded_temperature()
        ));
    }
    lines.truncate(days);

    if lines.is_empty() {
        return Err(PROCESS_ERROR.to_string());
    }
    Ok(lines)
}
