use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::permission::{PermissionDecision, PermissionRequest, PermissionTier};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateEvent {
    ToolStarted {
        tool_name: String,
        correlation_id: String,
    },
    ToolCompleted {
        tool_name: String,
        correlation_id: String,
        success: bool,
        duration_ms: u64,
    },
    SlowExecution {
        tool_name: String,
        correlation_id: String,
        duration_ms: u64,
        threshold_ms: u64,
    },
    PermissionRequested {
        request: PermissionRequest,
    },
    PermissionResolved {
        request_id: String,
        tool_name: String,
        decision: PermissionDecision,
    },
    PolicyChanged {
        tool_name: String,
        tier: Option<PermissionTier>,
    },
}

/// Broadcasts [`GateEvent`]s to any number of subscribers. Publishing with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GateEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: GateEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("No subscribers for gate event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
