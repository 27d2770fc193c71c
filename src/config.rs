use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::alerts::AlertOptions;
use crate::nws::GridPoint;
use crate::transport::Pacing;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Bot settings, read once at startup from `settings.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Only answer messages addressed to this node.
    #[serde(default)]
    pub dm_mode: bool,

    /// Drop messages from senders not listed in `MYNODES`.
    #[serde(default)]
    pub firewall: bool,

    #[serde(rename = "MYNODES", default, deserialize_with = "scalar_strings")]
    pub my_nodes: Vec<String>,

    /// Throttle replies with the rolling transmission quota.
    #[serde(rename = "DUTYCYCLE", default)]
    pub duty_cycle: bool,

    /// This node's id, when the bridge does not report it.
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub node_id: Option<String>,

    #[serde(default = "default_office")]
    pub nws_office: String,

    #[serde(default = "default_grid_x", deserialize_with = "scalar_string")]
    pub nws_grid_x: String,

    #[serde(default = "default_grid_y", deserialize_with = "scalar_string")]
    pub nws_grid_y: String,

    #[serde(default = "default_user_agent_app")]
    pub user_agent_app: String,

    #[serde(default = "default_user_agent_email")]
    pub user_agent_email: String,

    pub alert_lat: f64,

    pub alert_lon: f64,

    /// Seconds between alert polls.
    #[serde(default = "default_alert_interval")]
    pub alert_check_interval: u64,

    #[serde(default = "enabled")]
    pub alert_include_description: bool,

    #[serde(default = "enabled")]
    pub enable_full_alert_command: bool,

    #[serde(default = "enabled")]
    pub full_menu: bool,

    #[serde(default = "enabled")]
    pub enable_hourly_weather: bool,

    #[serde(rename = "ENABLE_5DAY_FORECAST", default = "enabled")]
    pub enable_5day_forecast: bool,

    #[serde(rename = "ENABLE_7DAY_FORECAST", default = "enabled")]
    pub enable_7day_forecast: bool,

    /// Seconds to wait before the first message of a reply.
    #[serde(default = "default_first_message_delay")]
    pub first_message_delay: u64,

    /// Seconds between the messages of a multi-part reply.
    #[serde(default = "default_message_delay")]
    pub message_delay: u64,

    /// Seconds before an upstream HTTP request is abandoned.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,
}

fn default_office() -> String {
    "HNX".to_string()
}

fn default_grid_x() -> String {
    "67".to_string()
}

fn default_grid_y() -> String {
    "80".to_string()
}

fn default_user_agent_app() -> String {
    "myweatherapp".to_string()
}

fn default_user_agent_email() -> String {
    "contact@example.com".to_string()
}

fn default_alert_interval() -> u64 {
    300
}

fn default_first_message_delay() -> u64 {
    3
}

fn default_message_delay() -> u64 {
    10
}

fn default_http_timeout() -> u64 {
    30
}

fn enabled() -> bool {
    true
}

// YAML types a bare `67` or `3663092544` as a number; accept either form.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn scalar_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let scalars = Option::<Vec<Scalar>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(scalars.into_iter().map(String::from).collect())
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// The `(app, email)` identification NWS asks every client to send.
    pub fn user_agent(&self) -> String {
        format!("({}, {})", self.user_agent_app, self.user_agent_email)
    }

    pub fn grid(&self) -> GridPoint {
        GridPoint {
            office: self.nws_office.clone(),
            x: self.nws_grid_x.clone(),
            y: self.nws_grid_y.clone(),
        }
    }

    /// Firewall check: the sender id must contain one of the allowed entries.
    pub fn allows_sender(&self, sender: &str) -> bool {
        self.my_nodes.iter().any(|node| sender.contains(node.as_str()))
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            first_message_delay: Duration::from_secs(self.first_message_delay),
            message_delay: Duration::from_secs(self.message_delay),
        }
    }

    pub fn alert_options(&self) -> AlertOptions {
        AlertOptions {
            include_description: self.alert_include_description,
            replay_enabled: self.enable_full_alert_command,
        }
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_check_interval)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}
