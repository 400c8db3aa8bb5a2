//! Typed relay events and the notifier registry.
//!
//! The registry maps an event kind to an ordered list of notifier handles.
//! Registration happens once during startup wiring; after that the lists are
//! read-only, so a registry behind `Arc` is safe to fire from any task.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::NotifyError;
use crate::indexer::ProtocolMessage;

/// The event kinds the relay fans out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new transaction hash arrived on the feed.
    Transaction,
    /// A new block hash arrived on the feed.
    Block,
    /// The indexing service confirmed a block and returned its messages.
    ProtocolMessages,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::Transaction,
        EventKind::Block,
        EventKind::ProtocolMessages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Block => "block",
            Self::ProtocolMessages => "protocol-messages",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event flowing through the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Lowercase-hex transaction identifier.
    Transaction { txid: String },
    /// Lowercase-hex block identifier.
    Block { block_hash: String },
    /// Parsed protocol messages for a confirmed block, in service order.
    ProtocolMessages { messages: Vec<ProtocolMessage> },
}

impl RelayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Transaction { .. } => EventKind::Transaction,
            Self::Block { .. } => EventKind::Block,
            Self::ProtocolMessages { .. } => EventKind::ProtocolMessages,
        }
    }
}

/// A fan-out sink for relay events.
pub trait Notifier: Send + Sync {
    /// Short name used in logs when this notifier fails.
    fn name(&self) -> &str;

    /// Deliver one event. Must not block; failures are isolated by the
    /// registry and never affect sibling notifiers.
    fn notify(&self, event: &RelayEvent) -> Result<(), NotifyError>;
}

/// Event kind → ordered list of notifiers.
pub struct NotifierRegistry {
    notifiers: HashMap<EventKind, Vec<Arc<dyn Notifier>>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self {
            notifiers: HashMap::new(),
        }
    }

    /// Append a notifier to the given kind's list. Called during startup
    /// wiring, before any `fire`.
    pub fn register(&mut self, kind: EventKind, notifier: Arc<dyn Notifier>) {
        self.notifiers.entry(kind).or_default().push(notifier);
    }

    /// Invoke every notifier registered for the event's kind, synchronously,
    /// in registration order. A failing notifier is logged and skipped; the
    /// rest still run.
    pub fn fire(&self, event: &RelayEvent) {
        let kind = event.kind();
        let Some(notifiers) = self.notifiers.get(&kind) else {
            return;
        };
        for notifier in notifiers {
            if let Err(e) = notifier.notify(event) {
                warn!(kind = %kind, notifier = notifier.name(), error = %e, "notifier failed");
            }
        }
    }

    /// Number of notifiers registered for a kind.
    pub fn registered(&self, kind: EventKind) -> usize {
        self.notifiers.get(&kind).map_or(0, Vec::len)
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
