//! `TopicFeed` trait — abstraction over the raw pub/sub notification socket.
//!
//! A concrete adapter (see `chainrelay-zmq`) connects, subscribes to the
//! fixed topic set, and then yields `(topic, payload)` pairs forever. The
//! sequence is infinite and non-restartable: an error from `next_event` is
//! fatal for the relay and surfaces to the operator.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FeedError;

/// One raw notification as delivered by the feed.
///
/// The topic is carried as a UTF-8 string; the payload encoding is
/// topic-specific (raw binary hashes for `hashtx` / `hashblock`).
#[derive(Debug, Clone)]
pub struct FeedEvent {
    pub topic: String,
    pub payload: Bytes,
}

impl FeedEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Pull seam over the notification socket.
#[async_trait]
pub trait TopicFeed: Send {
    /// Await the next raw notification.
    ///
    /// Never completes under normal operation. Malformed deliveries are
    /// dropped inside the adapter and do not surface here; any returned
    /// error means the feed connection is gone.
    async fn next_event(&mut self) -> Result<FeedEvent, FeedError>;
}
