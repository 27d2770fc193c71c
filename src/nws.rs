use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::alerts::AlertSource;
use crate::cache::ForecastSource;
use crate::weather::{AlertRecord, Horizon, Period};

const BASE_URL: &str = "https://api.weather.gov";

/// Errors from talking to api.weather.gov.
#[derive(Debug, thiserror::Error)]
pub enum NwsError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl NwsError {
    /// True when the service could not be reached or refused the request,
    /// as opposed to answering with something unreadable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, NwsError::Request(_) | NwsError::Status(_))
    }
}

/// Forecast office and grid cell identifying a forecast area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPoint {
    pub office: String,
    pub x: String,
    pub y: String,
}

impl GridPoint {
    fn forecast_url(&self, horizon: Horizon) -> String {
        let base = format!("{BASE_URL}/gridpoints/{}/{},{}/forecast", self.office, self.x, self.y);
        match horizon {
            Horizon::Hourly => format!("{base}/hourly"),
            Horizon::Daily => base,
        }
    }
}

pub mod gridpoints {
    use super::*;

    #[derive(Deserialize, Debug)]
    pub struct Gridpoints {
        properties: Properties,
    }

    #[derive(Deserialize, Debug)]
    struct Properties {
        #[serde(rename = "gridId")]
        grid_id: String,

        #[serde(rename = "gridX")]
        grid_x: i64,

        #[serde(rename = "gridY")]
        grid_y: i64,
    }

    impl Gridpoints {
        pub fn url(lat: f64, lon: f64) -> String {
            format!("{BASE_URL}/points/{lat:.4},{lon:.4}")
        }

        pub fn grid_point(&self) -> GridPoint {
            GridPoint {
                office: self.properties.grid_id.clone(),
                x: self.properties.grid_x.to_string(),
                y: self.properties.grid_y.to_string(),
            }
        }
    }
}

pub mod forecast {
    use super::*;

    #[derive(Deserialize, Debug, Default)]
    pub struct Forecast {
        pub properties: Properties,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct Properties {
        pub periods: Vec<Period>,
    }
}

pub mod alerts {
    use super::*;

    #[derive(Deserialize, Debug, Default)]
    pub struct Alerts {
        #[serde(default)]
        pub features: Vec<Feature>,
    }

    impl Alerts {
        pub fn url(lat: f64, lon: f64) -> String {
            format!("{BASE_URL}/alerts/active?point={lat},{lon}")
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct Feature {
        pub properties: Properties,
    }

    #[derive(Deserialize, Debug)]
    pub struct Properties {
        pub id: String,

        #[serde(default)]
        pub event: String,

        pub headline: Option<String>,

        pub description: Option<String>,
    }

    impl From<Feature> for AlertRecord {
        fn from(feature: Feature) -> Self {
            let props = feature.properties;
            AlertRecord {
                id: props.id,
                headline: props.headline.unwrap_or(props.event),
                description: props.description.unwrap_or_default(),
            }
        }
    }
}

/// Blocking api.weather.gov client. Every request carries the configured
/// user agent, which NWS requires.
pub struct NwsClient {
    http: Client,
}

impl NwsClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, NwsError> {
        let http = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    pub fn forecast(&self, grid: &GridPoint, horizon: Horizon) -> Result<Vec<Period>, NwsError> {
        let forecast: forecast::Forecast = self.get_json(&grid.forecast_url(horizon))?;
        Ok(forecast.properties.periods)
    }

    /// Active alerts for a point, most relevant first.
    pub fn active_alerts(&self, lat: f64, lon: f64) -> Result<Vec<AlertRecord>, NwsError> {
        let alerts: alerts::Alerts = self.get_json(&alerts::Alerts::url(lat, lon))?;
        Ok(alerts.features.into_iter().map(AlertRecord::from).collect())
    }

    /// Resolves the forecast grid cell covering a coordinate.
    pub fn grid_point(&self, lat: f64, lon: f64) -> Result<GridPoint, NwsError> {
        let points: gridpoints::Gridpoints = self.get_json(&gridpoints::Gridpoints::url(lat, lon))?;
        Ok(points.grid_point())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NwsError> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NwsError::Status(status.as_u16()));
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Forecasts for one fixed grid cell.
pub struct GridForecast {
    client: Arc<NwsClient>,
    grid: GridPoint,
}

impl GridForecast {
    pub fn new(client: Arc<NwsClient>, grid: GridPoint) -> Self {
        Self { client, grid }
    }
}

impl ForecastSource for GridForecast {
    fn fetch(&self, horizon: Horizon) -> Result<Vec<Period>, NwsError> {
        self.client.forecast(&self.grid, horizon)
    }
}

/// Active alerts for one fixed coordinate.
pub struct PointAlerts {
    client: Arc<NwsClient>,
    lat: f64,
    lon: f64,
}

impl PointAlerts {
    pub fn new(client: Arc<NwsClient>, lat: f64, lon: f64) -> Self {
        Self { client, lat, lon }
    }
}

impl AlertSource for PointAlerts {
    fn active_alerts(&self) -> Result<Vec<AlertRecord>, NwsError> {
        self.client.active_alerts(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forecast_urls() {
        let grid = GridPoint {
            office: "HNX".into(),
            x: "67".into(),
            y: "80".into(),
        };
        assert_eq!(
            grid.forecast_url(Horizon::Daily),
            "https://api.weather.gov/gridpoints/HNX/67,80/forecast"
        );
        assert_eq!(
            grid.forecast_url(Horizon::Hourly),
            "https://api.weather.gov/gridpoints/HNX/67,80/forecast/hourly"
        );
    }

    #[test]
    fn test_gridpoints_payload() {
        let points: gridpoints::Gridpoints = serde_json::from_value(json!({
            "properties": { "gridId": "LOX", "gridX": 150, "gridY": 48, "forecast": "..." }
        }))
        .unwrap();
        assert_eq!(
            points.grid_point(),
            GridPoint {
                office: "LOX".into(),
                x: "150".into(),
                y: "48".into()
            }
        );
    }

    #[test]
    fn test_alert_feature_falls_back_to_event_name() {
        let alerts: alerts::Alerts = serde_json::from_value(json!({
            "features": [
                { "properties": { "id": "urn:oid:2.49.0.1.840.0.1", "event": "Wind Advisory",
                                  "headline": null, "description": "Gusty." } }
            ]
        }))
        .unwrap();
        let record: Vec<AlertRecord> = alerts.features.into_iter().map(AlertRecord::from).collect();
        assert_eq!(record[0].headline, "Wind Advisory");
        assert_eq!(record[0].description, "Gusty.");
    }

    #[test]
    fn test_empty_alert_feed() {
        let alerts: alerts::Alerts = serde_json::from_value(json!({ "type": "FeatureCollection" })).unwrap();
        assert!(alerts.features.is_empty());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(NwsError::Status(503).is_connectivity());
        let parse = serde_json::from_str::<forecast::Forecast>("not json").unwrap_err();
        assert!(!NwsError::from(parse).is_connectivity());
    }
}
