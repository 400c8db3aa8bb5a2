//! Broadcast client registry.
//!
//! Each connected WebSocket client gets its own bounded `tokio::sync::mpsc`
//! queue so a slow client can never block the sender or other clients. The
//! membership map is mutated by the WebSocket handlers while `send_to_all`
//! iterates it, so it sits behind an `RwLock`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::debug;

/// Unique identifier for a connected client.
pub type ClientId = u64;

/// The set of currently connected clients.
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, mpsc::Sender<String>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl ClientRegistry {
    /// Create a registry with the given per-client queue capacity.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new client; returns its id and the frame receiver the
    /// socket task drains.
    pub fn add_client(&self) -> (ClientId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.clients.write().unwrap().insert(id, tx);
        (id, rx)
    }

    /// Remove a client, returning whether it was present.
    pub fn remove_client(&self, id: ClientId) -> bool {
        self.clients.write().unwrap().remove(&id).is_some()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    /// Best-effort delivery of one frame to every connected client.
    ///
    /// A client with a full queue is skipped for this frame (it misses
    /// timing, nothing more); a client whose queue is closed is removed.
    /// Never blocks, never errors.
    pub fn send_to_all(&self, frame: &str) {
        let mut stale = Vec::new();
        {
            let clients = self.clients.read().unwrap();
            for (id, tx) in clients.iter() {
                match tx.try_send(frame.to_owned()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(client_id = id, "client queue full, frame skipped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        stale.push(*id);
                    }
                }
            }
        }
        if !stale.is_empty() {
            let mut clients = self.clients.write().unwrap();
            for id in stale {
                clients.remove(&id);
                debug!(client_id = id, "removed disconnected client");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_with_no_clients_is_noop() {
        let registry = ClientRegistry::new(4);
        registry.send_to_all("{\"hashtx\":\"ab\"}");
        assert_eq!(registry.client_count(), 0);
    }

    #[tokio::test]
    async fn all_ready_clients_receive() {
        let registry = ClientRegistry::new(4);
        let (_a, mut rx_a) = registry.add_client();
        let (_b, mut rx_b) = registry.add_client();

        registry.send_to_all("frame");

        assert_eq!(rx_a.recv().await.unwrap(), "frame");
        assert_eq!(rx_b.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn full_queue_is_skipped_not_blocked() {
        let registry = ClientRegistry::new(1);
        let (_slow, mut rx_slow) = registry.add_client();
        let (_ok, mut rx_ok) = registry.add_client();

        registry.send_to_all("one");
        registry.send_to_all("two"); // slow client's queue is full now

        assert_eq!(rx_slow.recv().await.unwrap(), "one");
        assert!(rx_slow.try_recv().is_err());
        assert_eq!(rx_ok.recv().await.unwrap(), "one");
        assert_eq!(rx_ok.recv().await.unwrap(), "two");
        assert_eq!(registry.client_count(), 2);
    }

    #[tokio::test]
    async fn closed_client_is_removed_on_send() {
        let registry = ClientRegistry::new(4);
        let (_gone, rx_gone) = registry.add_client();
        let (_live, mut rx_live) = registry.add_client();
        drop(rx_gone);

        registry.send_to_all("frame");

        assert_eq!(registry.client_count(), 1);
        assert_eq!(rx_live.recv().await.unwrap(), "frame");
    }

    #[test]
    fn remove_client_reports_presence() {
        let registry = ClientRegistry::new(4);
        let (id, _rx) = registry.add_client();
        assert!(registry.remove_client(id));
        assert!(!registry.remove_client(id));
    }
}
