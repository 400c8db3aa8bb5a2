//! Notifier bridging relay events to WebSocket wire frames.
//!
//! Frames are tagged by event kind and serialized once per fire:
//! `{"hashtx": "<hex>"}`, `{"hashblock": "<hex>"}`, `{"xcp": [<messages>]}`.

use std::sync::Arc;

use serde_json::json;

use chainrelay_core::error::NotifyError;
use chainrelay_core::notify::{EventKind, Notifier, NotifierRegistry, RelayEvent};

use crate::broadcast::ClientRegistry;

/// Fans every relay event out to the connected clients.
pub struct BroadcastSink {
    clients: Arc<ClientRegistry>,
}

impl BroadcastSink {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

impl Notifier for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn notify(&self, event: &RelayEvent) -> Result<(), NotifyError> {
        let frame = wire_frame(event)?;
        self.clients.send_to_all(&frame);
        Ok(())
    }
}

/// Serialize one event into its wire frame.
fn wire_frame(event: &RelayEvent) -> Result<String, NotifyError> {
    let value = match event {
        RelayEvent::Transaction { txid } => json!({ "hashtx": txid }),
        RelayEvent::Block { block_hash } => json!({ "hashblock": block_hash }),
        RelayEvent::ProtocolMessages { messages } => json!({ "xcp": messages }),
    };
    Ok(serde_json::to_string(&value)?)
}

/// Startup wiring: register a broadcast sink for every event kind.
pub fn register_broadcast(registry: &mut NotifierRegistry, clients: Arc<ClientRegistry>) {
    for kind in EventKind::ALL {
        registry.register(kind, Arc::new(BroadcastSink::new(Arc::clone(&clients))));
    }
}
