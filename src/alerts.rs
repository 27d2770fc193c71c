//! Severe weather alert monitoring.
//!
//! The monitor polls the active-alerts feed for a fixed point. A new alert id
//! is broadcast to every node once; the latest alert is kept so users can ask
//! for it again. An empty feed clears the current alert, but the last seen id
//! is remembered so an alert that briefly drops out of the feed is not
//! announced a second time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::chunker;
use crate::nws::NwsError;
use crate::scheduler::Ticker;
use crate::transport::{Lead, Outbox, BROADCAST};
use crate::weather::AlertRecord;

pub const ALERT_LABEL: &str = "Alert--";
pub const STATUS_ACTIVE: &str = "🟢 Alert System: Active and monitoring for weather alerts";
pub const STATUS_UNREACHABLE: &str = "🔴 Alert System: Unable to connect to weather service";
pub const STATUS_INTERRUPTED: &str = "🔴 Alert System: Service interrupted - check logs";

/// Where active alerts come from.
pub trait AlertSource: Send + Sync {
    /// Active alerts, most relevant first.
    fn active_alerts(&self) -> Result<Vec<AlertRecord>, NwsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertOptions {
    /// Append the description to unsolicited broadcasts.
    pub include_description: bool,
    /// Allow users to request the current alert.
    pub replay_enabled: bool,
}

/// What a poll did to the monitor's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The feed was empty.
    Cleared,
    /// The top alert was the one already seen.
    Unchanged,
    /// A new alert became current.
    Raised(AlertRecord),
}

#[derive(Debug, Default)]
struct AlertState {
    last_seen_id: Option<String>,
    current: Option<AlertRecord>,
}

pub struct AlertMonitor {
    source: Box<dyn AlertSource>,
    outbox: Arc<Outbox>,
    options: AlertOptions,
    state: Mutex<AlertState>,
}

impl AlertMonitor {
    pub fn new(source: impl AlertSource + 'static, outbox: Arc<Outbox>, options: AlertOptions) -> Self {
        Self {
            source: Box::new(source),
            outbox,
            options,
            state: Mutex::new(AlertState::default()),
        }
    }

    /// Fetches the feed once and broadcasts the top alert if it is new.
    pub fn poll(&self) -> Result<Transition, NwsError> {
        let alerts = self.source.active_alerts()?;
        log::info!("Updated weather alerts");
        let transition = self.observe(alerts.into_iter().next());
        if let Transition::Raised(record) = &transition {
            self.broadcast(record);
        }
        Ok(transition)
    }

    fn observe(&self, latest: Option<AlertRecord>) -> Transition {
        let mut state = self.state.lock();
        match latest {
            None => {
                state.current = None;
                Transition::Cleared
            }
            Some(record) if state.last_seen_id.as_deref() == Some(record.id.as_str()) => {
                Transition::Unchanged
            }
            Some(record) => {
                state.last_seen_id = Some(record.id.clone());
                state.current = Some(record.clone());
                Transition::Raised(record)
            }
        }
    }

    pub fn current(&self) -> Option<AlertRecord> {
        self.state.lock().current.clone()
    }

    fn broadcast(&self, record: &AlertRecord) {
        let message = record.message(self.options.include_description);
        let parts = chunker::split_words(&message, chunker::DEFAULT_MAX_BYTES, ALERT_LABEL);
        log::info!("Broadcasting alert {} in {} part(s)", record.id, parts.len());
        self.outbox.send_sequence(&parts, BROADCAST, false, Lead::Immediate);
    }

    /// Sends the full current alert to one node. Returns false, sending
    /// nothing, when replay is disabled or no alert is current.
    pub fn replay_to(&self, destination: &str) -> bool {
        if !self.options.replay_enabled {
            return false;
        }
        let Some(record) = self.current() else {
            return false;
        };
        let parts = chunker::split_words(&record.message(true), chunker::DEFAULT_MAX_BYTES, ALERT_LABEL);
        self.outbox.send_sequence(&parts, destination, true, Lead::Immediate);
        true
    }

    pub fn replay_enabled(&self) -> bool {
        self.options.replay_enabled
    }

    /// Probes the feed and describes whether monitoring is working.
    pub fn status(&self) -> &'static str {
        match self.source.active_alerts() {
            Ok(_) => STATUS_ACTIVE,
            Err(e) => {
                log::error!("Weather Alert Monitor Status Check Failed: {e}");
                if e.is_connectivity() {
                    STATUS_UNREACHABLE
                } else {
                    STATUS_INTERRUPTED
                }
            }
        }
    }

    /// Polls now and then every `interval` until the ticker is dropped.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> std::io::Result<Ticker> {
        let monitor = Arc::clone(self);
        Ticker::spawn("alert-poll", interval, true, move || {
            if let Err(e) = monitor.poll() {
                log::error!("Failed to fetch weather alerts: {e}");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use crate::transport::Pacing;

    /// Serves queued responses, repeating the last one.
    struct ScriptedFeed {
        responses: Mutex<Vec<Result<Vec<AlertRecord>, u16>>>,
    }

    impl ScriptedFeed {
        fn new(mut responses: Vec<Result<Vec<AlertRecord>, u16>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl AlertSource for ScriptedFeed {
        fn active_alerts(&self) -> Result<Vec<AlertRecord>, NwsError> {
            let mut responses = self.responses.lock();
            let next = if responses.len() > 1 {
                responses.pop()
            } else {
                responses.last().cloned()
            };
            next.unwrap_or(Ok(Vec::new())).map_err(NwsError::Status)
        }
    }

    fn alert(id: &str) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            headline: format!("Heat Advisory issued {id}"),
            description: "Dangerously hot conditions with temperatures up to 108 expected.".to_string(),
        }
    }

    fn build_monitor(
        feed: Vec<Result<Vec<AlertRecord>, u16>>,
        options: AlertOptions,
    ) -> (AlertMonitor, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let outbox = Arc::new(Outbox::new(transport.clone(), Pacing::NONE));
        (AlertMonitor::new(ScriptedFeed::new(feed), outbox, options), transport)
    }

    const DEFAULTS: AlertOptions = AlertOptions {
        include_description: true,
        replay_enabled: true,
    };

    #[test]
    fn test_same_id_broadcasts_once() {
        let (monitor, transport) = build_monitor(vec![Ok(vec![alert("a")]), Ok(vec![alert("a")])], DEFAULTS);
        assert!(matches!(monitor.poll().unwrap(), Transition::Raised(_)));
        assert_eq!(monitor.poll().unwrap(), Transition::Unchanged);

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, BROADCAST);
        assert!(!sent[0].want_ack);
        assert!(sent[0].text.starts_with("--(1/1) Alert--\nHeat Advisory issued a Description:"));
    }

    #[test]
    fn test_new_id_replaces_current() {
        let (monitor, transport) = build_monitor(vec![Ok(vec![alert("a")]), Ok(vec![alert("b"), alert("a")])], DEFAULTS);
        monitor.poll().unwrap();
        assert_eq!(monitor.poll().unwrap(), Transition::Raised(alert("b")));
        assert_eq!(monitor.current().unwrap().id, "b");
        assert_eq!(transport.take().len(), 2);
    }

    #[test]
    fn test_empty_feed_clears_but_remembers_id() {
        let (monitor, transport) = build_monitor(
            vec![Ok(vec![alert("a")]), Ok(Vec::new()), Ok(vec![alert("a")])],
            DEFAULTS,
        );
        monitor.poll().unwrap();
        assert_eq!(monitor.poll().unwrap(), Transition::Cleared);
        assert!(monitor.current().is_none());
        assert_eq!(monitor.poll().unwrap(), Transition::Unchanged);
        assert_eq!(transport.take().len(), 1);
    }

    #[test]
    fn test_fetch_failure_leaves_state_alone() {
        let (monitor, _transport) = build_monitor(vec![Ok(vec![alert("a")]), Err(503)], DEFAULTS);
        monitor.poll().unwrap();
        assert!(monitor.poll().is_err());
        assert_eq!(monitor.current().unwrap().id, "a");
    }

    #[test]
    fn test_headline_only_broadcast() {
        let options = AlertOptions {
            include_description: false,
            ..DEFAULTS
        };
        let (monitor, transport) = build_monitor(vec![Ok(vec![alert("a")])], options);
        monitor.poll().unwrap();
        assert_eq!(transport.take()[0].text, "--(1/1) Alert--\nHeat Advisory issued a");
    }

    #[test]
    fn test_long_alert_is_paginated() {
        let mut long = alert("a");
        long.description = "Extreme heat. ".repeat(40);
        let (monitor, transport) = build_monitor(vec![Ok(vec![long])], DEFAULTS);
        monitor.poll().unwrap();
        let sent = transport.take();
        assert!(sent.len() > 1);
        assert!(sent[0].text.starts_with(&format!("--(1/{}) Alert--\n", sent.len())));
    }

    #[test]
    fn test_replay_goes_to_requester_with_description() {
        let options = AlertOptions {
            include_description: false,
            ..DEFAULTS
        };
        let (monitor, transport) = build_monitor(vec![Ok(vec![alert("a")])], options);
        assert!(!monitor.replay_to("42"));
        monitor.poll().unwrap();
        transport.take();

        assert!(monitor.replay_to("42"));
        let sent = transport.take();
        assert_eq!(sent[0].destination, "42");
        assert!(sent[0].want_ack);
        assert!(sent[0].text.contains("Description:"));
    }

    #[test]
    fn test_replay_disabled() {
        let options = AlertOptions {
            replay_enabled: false,
            ..DEFAULTS
        };
        let (monitor, transport) = build_monitor(vec![Ok(vec![alert("a")])], options);
        monitor.poll().unwrap();
        transport.take();
        assert!(!monitor.replay_to("42"));
        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_status() {
        let (monitor, _) = build_monitor(vec![Ok(Vec::new())], DEFAULTS);
        assert_eq!(monitor.status(), STATUS_ACTIVE);
        let (monitor, _) = build_monitor(vec![Err(500)], DEFAULTS);
        assert_eq!(monitor.status(), STATUS_UNREACHABLE);
    }
}
