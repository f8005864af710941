//! Engine Event Streaming
//!
//! Structured progress events emitted by the engine. Components report
//! through an [`EventSink`] and never print; the caller decides where
//! events go (console renderer, tracing, a test recorder, nowhere).

use serde::Serialize;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::types::{ActionRecord, Alert, FixError, PhaseKind, ValidationKind};

/// Capacity of the broadcast channel; slow subscribers lose the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    StageStarted {
        stage: String,
    },
    StageCompleted {
        stage: String,
        duration_ms: u64,
    },
    BaselineChecked {
        passed: bool,
        failed: Vec<ValidationKind>,
    },
    SnapshotCreated {
        snapshot: String,
    },
    BatchStarted {
        index: usize,
        total: usize,
        phase: PhaseKind,
        files: usize,
        issues: usize,
    },
    IssueFixed {
        file: String,
        line: u32,
        rule_id: String,
    },
    IssueSkipped {
        file: String,
        line: u32,
        rule_id: String,
        reason: String,
    },
    FixFailed {
        error: FixError,
    },
    BatchValidated {
        index: usize,
        passed: bool,
        detail: Option<String>,
    },
    BatchCommitted {
        index: usize,
        fixed: usize,
    },
    RolledBack {
        index: usize,
        snapshot: String,
        failures: u32,
    },
    RunFinished {
        success: bool,
        fixed: usize,
        failed: usize,
        rollbacks: u32,
    },
    AlertDispatched {
        alert: Alert,
        channels: Vec<String>,
    },
    AlertSuppressed {
        metric: String,
        reason: String,
    },
    ActionExecuted {
        record: ActionRecord,
    },
    Message {
        level: MessageLevel,
        message: String,
    },
}

/// Receives engine events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub type SharedSink = Arc<dyn EventSink>;

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::FixFailed { error } => {
                tracing::warn!(file = %error.file, rule = %error.rule_id, "Fix failed: {}", error.message)
            }
            EngineEvent::RolledBack {
                index, failures, ..
            } => tracing::warn!(batch = index, failures, "Batch rolled back"),
            EngineEvent::Message {
                level: MessageLevel::Error,
                message,
            } => tracing::error!("{}", message),
            EngineEvent::Message {
                level: MessageLevel::Warning,
                message,
            } => tracing::warn!("{}", message),
            EngineEvent::Message { message, .. } => tracing::info!("{}", message),
            other => tracing::debug!(?other, "engine event"),
        }
    }
}

/// Fans events out to any number of subscribers.
///
/// Sending with no subscribers is normal operation and drops the event.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count_where(&self, pred: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Emit `StageStarted` now and `StageCompleted` when dropped
pub struct StageGuard<'a> {
    sink: &'a dyn EventSink,
    stage: String,
    started: std::time::Instant,
}

impl<'a> StageGuard<'a> {
    pub fn start(sink: &'a dyn EventSink, stage: &str) -> Self {
        sink.emit(EngineEvent::StageStarted {
            stage: stage.to_string(),
        });
        Self {
            sink,
            stage: stage.to_string(),
            started: std::time::Instant::now(),
        }
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.sink.emit(EngineEvent::StageCompleted {
            stage: std::mem::take(&mut self.stage),
            duration_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(EngineEvent::SnapshotCreated {
            snapshot: "snap-1".to_string(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            EngineEvent::SnapshotCreated {
                snapshot: "snap-1".to_string()
            }
        );
    }

    #[test]
    fn test_bus_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(EngineEvent::Message {
            level: MessageLevel::Info,
            message: "nobody listens".to_string(),
        });
    }

    #[test]
    fn test_stage_guard() {
        let sink = RecordingSink::new();
        {
            let _guard = StageGuard::start(&sink, "classify");
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], EngineEvent::StageCompleted { stage, .. } if stage == "classify"));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(EngineEvent::BatchCommitted { index: 2, fixed: 5 }).unwrap();
        assert_eq!(json["event"], "batch_committed");
        assert_eq!(json["fixed"], 5);
    }
}
