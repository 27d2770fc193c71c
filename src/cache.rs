use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::nws::{GridForecast, NwsClient, NwsError};
use crate::weather::{Horizon, Period, WeatherSnapshot};

/// Where forecast periods come from.
pub trait ForecastSource: Send + Sync {
    fn fetch(&self, horizon: Horizon) -> Result<Vec<Period>, NwsError>;
}

type Slot = Mutex<Option<Arc<WeatherSnapshot>>>;

/// Lazily refreshed hourly and daily forecasts.
///
/// Each horizon is refreshed on access once its snapshot is older than the
/// refresh interval. A failed refresh keeps whatever snapshot was there before,
/// so callers see stale data (or `None`) rather than an error.
pub struct WeatherDataCache {
    source: Box<dyn ForecastSource>,
    refresh_interval: Duration,
    hourly: Slot,
    daily: Slot,
}

impl WeatherDataCache {
    pub fn new(source: impl ForecastSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            refresh_interval: Duration::hours(1),
            hourly: Mutex::new(None),
            daily: Mutex::new(None),
        }
    }

    /// A standalone cache for an ad-hoc coordinate, independent of the
    /// bot's configured grid.
    pub fn for_coordinates(client: Arc<NwsClient>, lat: f64, lon: f64) -> Result<Self, NwsError> {
        let grid = client.grid_point(lat, lon)?;
        log::info!(
            "Resolved ({lat}, {lon}) to grid {}/{},{}",
            grid.office,
            grid.x,
            grid.y
        );
        Ok(Self::new(GridForecast::new(client, grid)))
    }

    pub fn hourly(&self) -> Option<Arc<WeatherSnapshot>> {
        self.hourly_at(Utc::now())
    }

    pub fn daily(&self) -> Option<Arc<WeatherSnapshot>> {
        self.daily_at(Utc::now())
    }

    pub fn hourly_at(&self, now: DateTime<Utc>) -> Option<Arc<WeatherSnapshot>> {
        self.get(Horizon::Hourly, now)
    }

    pub fn daily_at(&self, now: DateTime<Utc>) -> Option<Arc<WeatherSnapshot>> {
        self.get(Horizon::Daily, now)
    }

    /// Refetches both horizons regardless of age. True only if both succeeded.
    pub fn force_refresh(&self) -> bool {
        let now = Utc::now();
        let hourly = self.refresh(Horizon::Hourly, now);
        let daily = self.refresh(Horizon::Daily, now);
        hourly && daily
    }

    fn slot(&self, horizon: Horizon) -> &Slot {
        match horizon {
            Horizon::Hourly => &self.hourly,
            Horizon::Daily => &self.daily,
        }
    }

    fn get(&self, horizon: Horizon, now: DateTime<Utc>) -> Option<Arc<WeatherSnapshot>> {
        let expired = match self.slot(horizon).lock().as_ref() {
            None => true,
            Some(snapshot) => now - snapshot.fetched_at > self.refresh_interval,
        };
        if expired {
            self.refresh(horizon, now);
        }
        self.slot(horizon).lock().clone()
    }

    // The slot lock is only taken to swap in the result, never across the fetch.
    fn refresh(&self, horizon: Horizon, now: DateTime<Utc>) -> bool {
        match self.source.fetch(horizon) {
            Ok(periods) => {
                let mut slot = self.slot(horizon).lock();
                // never let a snapshot be older than the one it replaces
                let fetched_at = slot.as_ref().map_or(now, |prev| prev.fetched_at.max(now));
                *slot = Some(Arc::new(WeatherSnapshot { fetched_at, periods }));
                log::info!("Updated {horizon} weather data");
                true
            }
            Err(e) => {
                log::error!("Failed to fetch {horizon} weather data: {e}");
                false
            }
        }
    }
}
