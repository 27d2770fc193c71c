//! The boundary to the mesh radio.
//!
//! The bot exchanges newline-delimited JSON frames with a bridge process that
//! owns the radio link. Everything outbound goes through [`Outbox`], which
//! keeps the messages of one reply together and paced.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};

/// Destination id that addresses every node.
pub const BROADCAST: &str = "^all";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A text message heard on the mesh.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    #[serde(deserialize_with = "node_id")]
    pub from: String,

    #[serde(default, deserialize_with = "optional_node_id")]
    pub to: Option<String>,

    pub text: String,
}

impl InboundMessage {
    /// Addressed to this node rather than broadcast.
    pub fn is_direct_to(&self, my_node: Option<&str>) -> bool {
        match (self.to.as_deref(), my_node) {
            (Some(to), Some(me)) => to == me,
            _ => false,
        }
    }
}

// Node ids arrive either as numbers or as strings depending on the bridge.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Number(u64),
    Text(String),
}

impl From<RawNodeId> for String {
    fn from(raw: RawNodeId) -> Self {
        match raw {
            RawNodeId::Number(n) => n.to_string(),
            RawNodeId::Text(s) => s,
        }
    }
}

fn node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawNodeId::deserialize(deserializer).map(String::from)
}

fn optional_node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawNodeId>::deserialize(deserializer)?.map(String::from))
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    to: &'a str,
    text: &'a str,
    want_ack: bool,
}

/// Something that can put a text message on the air.
pub trait Transport: Send + Sync {
    fn send_text(&self, text: &str, destination: &str, want_ack: bool) -> Result<(), TransportError>;
}

/// Writes outbound frames as JSON lines.
pub struct JsonLinesTransport<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn send_text(&self, text: &str, destination: &str, want_ack: bool) -> Result<(), TransportError> {
        let frame = OutboundFrame {
            to: destination,
            text,
            want_ack,
        };
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, &frame)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Reads inbound frames until the stream ends or `deliver` returns false.
/// Lines that do not decode are logged and skipped.
pub fn read_frames<R: BufRead>(reader: R, mut deliver: impl FnMut(InboundMessage) -> bool) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Transport read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => {
                if !deliver(message) {
                    break;
                }
            }
            Err(e) => log::error!("Unable to decode incoming message: {e}"),
        }
    }
}

/// Delays applied around outbound sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause before the first message of a reply.
    pub first_message_delay: Duration,
    /// Pause between consecutive messages of one sequence.
    pub message_delay: Duration,
}

impl Pacing {
    pub const NONE: Pacing = Pacing {
        first_message_delay: Duration::ZERO,
        message_delay: Duration::ZERO,
    };
}

/// Whether a sequence waits `first_message_delay` before starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    Delayed,
    Immediate,
}

/// Serialises all outbound traffic. A sequence holds the lane until its last
/// message is sent, so replies never interleave.
pub struct Outbox {
    transport: Arc<dyn Transport>,
    pacing: Pacing,
    lane: Mutex<()>,
}

impl Outbox {
    pub fn new(transport: Arc<dyn Transport>, pacing: Pacing) -> Self {
        Self {
            transport,
            pacing,
            lane: Mutex::new(()),
        }
    }

    pub fn send_sequence(&self, messages: &[String], destination: &str, want_ack: bool, lead: Lead) {
        if messages.is_empty() {
            return;
        }
        let _lane = self.lane.lock();
        if lead == Lead::Delayed {
            thread::sleep(self.pacing.first_message_delay);
        }
        for (i, text) in messages.iter().enumerate() {
            if let Err(e) = self.transport.send_text(text, destination, want_ack) {
                log::error!("Failed to send message {}/{} to {destination}: {e}", i + 1, messages.len());
            }
            if i + 1 < messages.len() {
                thread::sleep(self.pacing.message_delay);
            }
        }
    }

    /// A single acknowledged reply after the usual lead-in pause.
    pub fn reply(&self, text: &str, destination: &str) {
        self.send_sequence(&[text.to_string()], destination, true, Lead::Delayed);
    }

    /// A single message sent right away.
    pub fn send(&self, text: &str, destination: &str, want_ack: bool) {
        self.send_sequence(&[text.to_string()], destination, want_ack, Lead::Immediate);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_numeric_and_string_ids() {
        let message: InboundMessage =
            serde_json::from_str(r#"{"from": 3663092544, "to": "!da5ad56c", "text": "Temp"}"#).unwrap();
        assert_eq!(message.from, "3663092544");
        assert_eq!(message.to.as_deref(), Some("!da5ad56c"));
        assert!(message.is_direct_to(Some("!da5ad56c")));
        assert!(!message.is_direct_to(None));
    }

    #[test]
    fn test_missing_destination_is_broadcast() {
        let message: InboundMessage = serde_json::from_str(r#"{"from": "1", "text": "hi"}"#).unwrap();
        assert!(!message.is_direct_to(Some("1")));
    }

    #[test]
    fn test_read_frames_skips_malformed_lines() {
        let input = "{\"from\": 1, \"to\": 2, \"text\": \"menu\"}\nnot json\n\n{\"to\": 2}\n{\"from\": 5, \"text\": \"rain\"}\n";
        let mut received = Vec::new();
        read_frames(Cursor::new(input), |m| {
            received.push(m.text);
            true
        });
        assert_eq!(received, vec!["menu", "rain"]);
    }

    #[test]
    fn test_json_lines_output() {
        let transport = JsonLinesTransport::new(Vec::new());
        transport.send_text("hello", BROADCAST, false).unwrap();
        let written = String::from_utf8(transport.writer.lock().clone()).unwrap();
        assert_eq!(written, "{\"to\":\"^all\",\"text\":\"hello\",\"want_ack\":false}\n");
    }

    #[test]
    fn test_sequence_keeps_order() {
        let transport = Arc::new(RecordingTransport::default());
        let outbox = Outbox::new(transport.clone(), Pacing::NONE);
        let messages: Vec<String> = (1..=3).map(|i| format!("part {i}")).collect();
        outbox.send_sequence(&messages, "42", true, Lead::Delayed);

        let sent = transport.take();
        let texts: Vec<&str> = sent.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["part 1", "part 2", "part 3"]);
        assert!(sent.iter().all(|s| s.destination == "42" && s.want_ack));
    }

    #[test]
    fn test_concurrent_sequences_do_not_interleave() {
        let transport = Arc::new(RecordingTransport::default());
        let outbox = Arc::new(Outbox::new(
            transport.clone(),
            Pacing {
                first_message_delay: Duration::ZERO,
                message_delay: Duration::from_millis(5),
            },
        ));
        let senders: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|tag| {
                let outbox = Arc::clone(&outbox);
                thread::spawn(move || {
                    let parts: Vec<String> = (0..4).map(|i| format!("{tag}{i}")).collect();
                    outbox.send_sequence(&parts, "7", false, Lead::Immediate);
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }

        let sent = transport.take();
        let tags: String = sent.iter().map(|s| &s.text[..1]).collect();
        assert!(tags == "aaaabbbb" || tags == "bbbbaaaa", "interleaved: {tags}");
    }
}
