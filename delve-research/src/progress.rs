//! Progress notifications
//!
//! Research components report status through a [`ProgressSink`]. Delivery is
//! fire-and-forget: the engine never blocks on a sink and never inspects the
//! outcome of a notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Info,
    Error,
    Success,
}

/// One structured status notification.
///
/// Serializes to the wire shape `{"type", "message", "data"?, "timestamp"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    fn new(kind: ProgressKind, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            kind,
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::new(ProgressKind::Info, message, data)
    }

    pub fn error(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::new(ProgressKind::Error, message, data)
    }

    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::new(ProgressKind::Success, message, data)
    }
}

/// Receiver of research progress.
///
/// Implementations must tolerate concurrent, unordered notifications from
/// multiple branches without requiring synchronization from callers.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Sink backed by a tokio broadcast channel.
///
/// Events sent while no receiver is subscribed are dropped, which is the
/// intended fire-and-forget behavior.
#[derive(Debug, Clone)]
pub struct BroadcastProgress {
    sender: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(sender: broadcast::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for BroadcastProgress {
    fn notify(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}
