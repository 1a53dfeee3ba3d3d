//! Outbound events.
//!
//! Every sample becomes exactly one [`Message`] handed to an [`EventChannel`].
//! Delivery is fire-and-forget: channels never report back and nothing is
//! retried or queued.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;

pub const DEFAULT_TOPIC: &str = "opentrain.scanner.message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Location,
    CellTelemetry,
}

impl EventKind {
    pub fn subject(self) -> &'static str {
        match self {
            EventKind::Location => "LocationScanner",
            EventKind::CellTelemetry => "CellScanner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub topic: String,
    pub subject: &'static str,
    pub payload: Value,
    /// Capture time in milliseconds since the unix epoch
    pub time: i64,
}

pub trait EventChannel {
    fn send(&self, message: Message);
}

#[derive(Clone)]
pub struct Emitter {
    topic: String,
    channel: Arc<dyn EventChannel + Send + Sync>,
}

impl Emitter {
    pub fn new(topic: impl Into<String>, channel: Arc<dyn EventChannel + Send + Sync>) -> Self {
        Self {
            topic: topic.into(),
            channel,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish<T: Serialize + ?Sized>(
        &self,
        kind: EventKind,
        payload: &T,
        timestamp_millis: i64,
    ) -> Result<()> {
        let message = Message {
            topic: self.topic.clone(),
            subject: kind.subject(),
            payload: serde_json::to_value(payload)?,
            time: timestamp_millis,
        };
        self.channel.send(message);
        Ok(())
    }
}

/// Fans messages out to any number of in-process subscribers.
pub struct BroadcastChannel {
    sender: broadcast::Sender<Message>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }
}

impl EventChannel for BroadcastChannel {
    fn send(&self, message: Message) {
        if let Err(e) = self.sender.send(message) {
            debug!(subject = e.0.subject, "no subscribers, dropping message");
        }
    }
}

/// Writes each message as one line of JSON.
pub struct JsonLinesChannel<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesChannel<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write> EventChannel for JsonLinesChannel<W> {
    fn send(&self, message: Message) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let result = serde_json::to_writer(&mut *writer, &message)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            warn!(subject = message.subject, "failed to write message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn broadcast() {
        let channel = Arc::new(BroadcastChannel::new(8));
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();

        let emitter = Emitter::new(DEFAULT_TOPIC, channel);
        emitter
            .publish(EventKind::CellTelemetry, &json!({ "cells": [] }), 42)
            .unwrap();

        let expected = Message {
            topic: DEFAULT_TOPIC.to_owned(),
            subject: "CellScanner",
            payload: json!({ "cells": [] }),
            time: 42,
        };
        assert_eq!(a.try_recv().unwrap(), expected);
        assert_eq!(b.try_recv().unwrap(), expected);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn broadcast_without_subscribers() {
        let emitter = Emitter::new("topic", Arc::new(BroadcastChannel::new(1)));
        assert!(emitter.publish(EventKind::Location, &1, 0).is_ok());
    }

    #[test]
    fn json_lines() {
        let channel = JsonLinesChannel::new(Vec::new());
        channel.send(Message {
            topic: "t".to_owned(),
            subject: EventKind::Location.subject(),
            payload: json!({ "latitude": 1.5 }),
            time: 7,
        });
        channel.send(Message {
            topic: "t".to_owned(),
            subject: EventKind::CellTelemetry.subject(),
            payload: json!(null),
            time: 8,
        });

        let out = String::from_utf8(channel.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap(),
            json!({ "topic": "t", "subject": "LocationScanner", "payload": { "latitude": 1.5 }, "time": 7 })
        );
    }
}
