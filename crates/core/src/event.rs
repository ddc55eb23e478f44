//! Domain event system: decoupled communication with the host.
//!
//! Events are published when something the host may care about happens:
//! a notification to show, a preset that needs persisting, an impersonation
//! that started or finished. Hosts subscribe and react without coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What happened to a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetChange {
    Created,
    Saved,
    Deleted,
    Imported,
    Switched,
}

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Something the user should see (toast, status line)
    Notification {
        level: NotificationLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A generation request entered the busy state
    ImpersonationStarted {
        request_id: Uuid,
        preset: String,
        turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// A generation request produced text
    ImpersonationCompleted {
        request_id: Uuid,
        characters: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A generation request failed after entering the busy state
    ImpersonationFailed {
        request_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The preset store changed and should be persisted
    PresetChanged {
        name: String,
        change: PresetChange,
        timestamp: DateTime<Utc>,
    },

    /// The top-level enabled flag changed
    SettingsChanged {
        enabled: bool,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn notification(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self::Notification {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn preset_changed(name: impl Into<String>, change: PresetChange) -> Self {
        Self::PresetChanged {
            name: name.into(),
            change,
            timestamp: Utc::now(),
        }
    }

    /// Whether the host should schedule a settings save after this event.
    pub fn requires_persist(&self) -> bool {
        matches!(self, Self::PresetChanged { .. } | Self::SettingsChanged { .. })
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Shorthand for publishing a notification.
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.publish(DomainEvent::notification(level, message));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
