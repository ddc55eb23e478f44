//! Renders notifications from the event bus on stderr.

use impersonator_core::{DomainEvent, EventBus, NotificationLevel};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub struct NotificationPrinter {
    rx: broadcast::Receiver<Arc<DomainEvent>>,
}

impl NotificationPrinter {
    pub fn attach(bus: &EventBus) -> Self {
        Self { rx: bus.subscribe() }
    }

    /// Print pending notifications. Returns true if any event asked for a
    /// settings save.
    pub fn flush(&mut self) -> bool {
        let mut persist = false;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    persist |= event.requires_persist();
                    if let DomainEvent::Notification { level, message, .. } = event.as_ref() {
                        eprintln!("{} {message}", icon(*level));
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped notifications");
                    persist = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        persist
    }
}

fn icon(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Info => "ℹ️ ",
        NotificationLevel::Success => "✅",
        NotificationLevel::Warning => "⚠️ ",
        NotificationLevel::Error => "❌",
    }
}
