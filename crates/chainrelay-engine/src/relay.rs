//! The relay loop.
//!
//! One logical consumer drives the feed. Transaction and block hashes fan
//! out synchronously in arrival order; every block hash additionally spawns
//! an independent confirmation task that never holds up the loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chainrelay_core::error::FeedError;
use chainrelay_core::feed::{FeedEvent, TopicFeed};
use chainrelay_core::indexer::IndexingApi;
use chainrelay_core::notify::{NotifierRegistry, RelayEvent};
use chainrelay_core::topic::Topic;

use crate::config::ConfirmConfig;
use crate::confirm::{ConfirmError, ConfirmationWaiter};

/// Owns the feed consumption loop and spawns confirmation tasks.
pub struct RelayEngine {
    registry: Arc<NotifierRegistry>,
    api: Arc<dyn IndexingApi>,
    confirm: ConfirmConfig,
    cancel: CancellationToken,
}

impl RelayEngine {
    pub fn new(
        registry: Arc<NotifierRegistry>,
        api: Arc<dyn IndexingApi>,
        confirm: ConfirmConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            api,
            confirm,
            cancel,
        }
    }

    /// Consume the feed until cancellation or a fatal feed error.
    ///
    /// The loop suspends only while awaiting the next event; confirmation
    /// tasks are fire-and-forget and keep running across iterations.
    pub async fn run<F: TopicFeed>(&self, mut feed: F) -> Result<(), FeedError> {
        info!("relay loop started");
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("relay loop cancelled");
                    return Ok(());
                }
                event = feed.next_event() => event?,
            };
            self.dispatch(event);
        }
    }

    /// Decode one raw event and fan it out. Unrecognized topics are dropped.
    pub fn dispatch(&self, event: FeedEvent) {
        match Topic::from_wire(&event.topic) {
            Some(Topic::HashTx) => {
                let txid = hex::encode(&event.payload);
                debug!(txid, "new transaction");
                self.registry.fire(&RelayEvent::Transaction { txid });
            }
            Some(Topic::HashBlock) => {
                let block_hash = hex::encode(&event.payload);
                debug!(block_hash, "new block");
                self.registry.fire(&RelayEvent::Block {
                    block_hash: block_hash.clone(),
                });
                self.spawn_confirmation(block_hash);
            }
            None => {
                debug!(topic = %event.topic, "ignoring unknown feed topic");
            }
        }
    }

    /// Spawn one confirmation task for a block hash. Duplicate deliveries
    /// spawn duplicate tasks (at-least-once, no deduplication).
    pub fn spawn_confirmation(&self, block_hash: String) -> JoinHandle<()> {
        let waiter = ConfirmationWaiter::new(
            Arc::clone(&self.api),
            Arc::clone(&self.registry),
            self.confirm.clone(),
            self.cancel.child_token(),
        );
        tokio::spawn(async move {
            match waiter.run(&block_hash).await {
                Ok(()) => {}
                Err(ConfirmError::Cancelled { .. }) => {
                    debug!(block_hash, "confirmation task cancelled");
                }
                Err(e) => {
                    error!(block_hash, error = %e, "confirmation task failed");
                }
            }
        })
    }
}
