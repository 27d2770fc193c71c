//! Inbound message handling.
//!
//! Commands are matched by substring in a fixed priority order, so a message
//! such as "rain or temp" is answered as `temp`. Every dispatched command
//! counts once against the duty cycle however many messages its reply takes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::alerts::AlertMonitor;
use crate::cache::WeatherDataCache;
use crate::config::Settings;
use crate::duty::{DutyCycleGuard, Threshold};
use crate::report::Report;
use crate::transport::{InboundMessage, Lead, Outbox, BROADCAST};

pub const ACK: &str = " ACK";

pub const COOLDOWN_NOTICE: &str = "❌ Bot has reached duty cycle, entering cool down... ❄";

pub const FULL_MENU: &str = "    --Multi-Message--\n\
hourly - 24h outlook\n\
7day - 7 day simple\n\
5day - 5 day detailed\n\
wind - 24h wind\n\n    \
--Single Message--\n\
2day - 2 day detailed\n\
4day - 4 day simple\n\
rain - 24h precipitation\n\
temp - 24h temperature\n";

pub const SHORT_MENU: &str = "  --Weather Commands--\n\
2day - 2 day forecast\n\
4day - 4 day forecast\n\
temp - 24h temperature\n\
rain - 24h precipitation";

pub const ADVERTISEMENT: &str = "Hello all! I am a weather bot that does weather alerts and forecasts. \
You can DM me \"?\" for a list of my forecast commands.\n\n\
For more information, check me out on Github. https://github.com/oasis6212/Meshbot_weather";

pub const REPLAY_DISABLED: &str = "The full-alert command is disabled in settings.";
pub const NO_ACTIVE_ALERTS: &str = "No active alerts at this time.";

pub const UNRECOGNIZED_MESSAGES: [&str; 7] = [
    "Oops! I didn't recognize that command. Type 'menu' to see a list of options.",
    "I'm not sure what you mean. Type 'menu' for available commands.",
    "That command isn't in my vocabulary. Send 'menu' to see what I understand.",
    "Hmm, I don't know that one. Send 'menu' for a list of commands I know.",
    "Sorry, I didn't catch that. Send 'menu' to see what commands you can use.",
    "Well that's definitely not in my programming. Type 'menu' before we both crash.",
    "Oh sure, just make up commands. Type 'menu' for the real ones.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Test,
    Menu,
    Temperature,
    TwoDay,
    Hourly,
    Rain,
    FiveDay,
    FourDay,
    Wind,
    Advertise,
    SevenDay,
    AlertStatus,
    Alert,
}

// Checked top to bottom; the first keyword found anywhere in the text wins.
const KEYWORDS: [(&str, Command); 14] = [
    ("test", Command::Test),
    ("?", Command::Menu),
    ("menu", Command::Menu),
    ("temp", Command::Temperature),
    ("2day", Command::TwoDay),
    ("hourly", Command::Hourly),
    ("rain", Command::Rain),
    ("5day", Command::FiveDay),
    ("4day", Command::FourDay),
    ("wind", Command::Wind),
    ("advertise", Command::Advertise),
    ("7day", Command::SevenDay),
    ("alert-status", Command::AlertStatus),
    ("alert", Command::Alert),
];

impl Command {
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|&(_, command)| command)
    }

    fn report(self) -> Option<Report> {
        match self {
            Command::Temperature => Some(Report::Temperature),
            Command::TwoDay => Some(Report::TwoDay),
            Command::Hourly => Some(Report::Hourly),
            Command::Rain => Some(Report::Rain),
            Command::FiveDay => Some(Report::FiveDay),
            Command::FourDay => Some(Report::FourDay),
            Command::Wind => Some(Report::Wind),
            Command::SevenDay => Some(Report::SevenDay),
            _ => None,
        }
    }
}

/// What the router did with one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not for us: a broadcast in DM mode, or unrecognized broadcast text.
    Ignored,
    /// Sender not on the allow-list.
    Blocked,
    /// Transmission quota exhausted.
    Suppressed,
    Dispatched(Command),
    /// A direct message that matched no command; a hint was sent.
    Unrecognized,
}

pub struct CommandRouter {
    settings: Arc<Settings>,
    my_node: Option<String>,
    weather: Arc<WeatherDataCache>,
    alerts: Arc<AlertMonitor>,
    duty: Arc<DutyCycleGuard>,
    outbox: Arc<Outbox>,
}

impl CommandRouter {
    pub fn new(
        settings: Arc<Settings>,
        my_node: Option<String>,
        weather: Arc<WeatherDataCache>,
        alerts: Arc<AlertMonitor>,
        duty: Arc<DutyCycleGuard>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            settings,
            my_node,
            weather,
            alerts,
            duty,
            outbox,
        }
    }

    pub fn handle(&self, message: &InboundMessage) -> Disposition {
        self.handle_at(message, Utc::now())
    }

    pub fn handle_at(&self, message: &InboundMessage, now: DateTime<Utc>) -> Disposition {
        let direct = message.is_direct_to(self.my_node.as_deref());
        if direct {
            log::info!("Message {} from {}", message.text, message.from);
            log::info!("transmission count {}", self.duty.snapshot().transmission_count);
        }

        if self.settings.dm_mode && !direct {
            return Disposition::Ignored;
        }

        if self.settings.firewall && !self.settings.allows_sender(&message.from) {
            log::warn!("Firewall blocked message from {}: {}", message.from, message.text);
            return Disposition::Blocked;
        }

        let disposition = if self.duty.allows_reply() {
            self.dispatch(message, direct, now)
        } else {
            Disposition::Suppressed
        };

        match self.duty.check_threshold() {
            Threshold::Below => {}
            threshold => {
                if threshold == Threshold::EnteringCooldown {
                    self.outbox.send(COOLDOWN_NOTICE, BROADCAST, false);
                    log::info!("Cooldown enabled.");
                }
                log::info!("Duty cycle limit reached. Please wait before transmitting again.");
            }
        }
        disposition
    }

    fn dispatch(&self, message: &InboundMessage, direct: bool, now: DateTime<Utc>) -> Disposition {
        let sender = message.from.as_str();
        let Some(command) = Command::parse(&message.text) else {
            if !direct {
                return Disposition::Ignored;
            }
            if !self.duty.try_record() {
                return Disposition::Suppressed;
            }
            let hint = UNRECOGNIZED_MESSAGES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(UNRECOGNIZED_MESSAGES[0]);
            self.outbox.send(hint, sender, true);
            return Disposition::Unrecognized;
        };

        if let Some(notice) = self.disabled_notice(command) {
            self.outbox.reply(notice, sender);
            return Disposition::Dispatched(command);
        }

        if !self.duty.try_record() {
            return Disposition::Suppressed;
        }
        match command {
            Command::Test => self.outbox.reply(ACK, sender),
            Command::Menu => {
                let menu = if self.settings.full_menu { FULL_MENU } else { SHORT_MENU };
                self.outbox.reply(menu, sender);
            }
            Command::Advertise => self.outbox.send(ADVERTISEMENT, BROADCAST, true),
            Command::AlertStatus => self.outbox.send(self.alerts.status(), sender, true),
            Command::Alert => {
                if !self.alerts.replay_to(sender) {
                    let reason = if self.alerts.replay_enabled() {
                        NO_ACTIVE_ALERTS
                    } else {
                        REPLAY_DISABLED
                    };
                    self.outbox.reply(reason, sender);
                }
            }
            report => {
                if let Some(report) = report.report() {
                    let messages = report.render(&self.weather, now);
                    self.outbox.send_sequence(&messages, sender, true, Lead::Delayed);
                }
            }
        }
        Disposition::Dispatched(command)
    }

    fn disabled_notice(&self, command: Command) -> Option<&'static str> {
        match command {
            Command::Hourly if !self.settings.enable_hourly_weather => {
                Some("Hourly weather module is disabled.")
            }
            Command::FiveDay if !self.settings.enable_5day_forecast => {
                Some("5-day forecast module is disabled.")
            }
            Command::SevenDay if !self.settings.enable_7day_forecast => {
                Some("7-day forecast module is disabled.")
            }
            _ => None,
        }
    }
}
