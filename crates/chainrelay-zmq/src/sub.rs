//! `ZmqFeed` — ZeroMQ SUB socket adapter for node notifications.
//!
//! The node publishes multipart messages: frame 0 is the topic as UTF-8,
//! frame 1 is the raw binary hash payload, and an optional frame 2 carries a
//! sequence counter the relay does not use. Deliveries that do not match
//! this shape are logged at debug level and dropped; they never reach the
//! relay loop and never terminate the feed.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use zeromq::{Socket, SocketRecv, SubSocket};

use chainrelay_core::error::FeedError;
use chainrelay_core::feed::{FeedEvent, TopicFeed};
use chainrelay_core::topic::Topic;

/// ZeroMQ SUB feed. Connection failure is fatal: the adapter has no
/// reconnect logic, errors surface to the operator through the relay.
pub struct ZmqFeed {
    socket: SubSocket,
    endpoint: String,
}

impl ZmqFeed {
    /// Connect to the node's pub/sub endpoint and subscribe to the given
    /// topics.
    pub async fn connect(endpoint: &str, topics: &[Topic]) -> Result<Self, FeedError> {
        let mut socket = SubSocket::new();
        socket
            .connect(endpoint)
            .await
            .map_err(|e| FeedError::Connect {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        for topic in topics {
            socket
                .subscribe(topic.as_str())
                .await
                .map_err(|e| FeedError::Subscribe {
                    topic: topic.as_str().into(),
                    reason: e.to_string(),
                })?;
        }

        info!(endpoint, ?topics, "zmq feed connected");
        Ok(Self {
            socket,
            endpoint: endpoint.into(),
        })
    }

    /// The endpoint this feed is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TopicFeed for ZmqFeed {
    async fn next_event(&mut self) -> Result<FeedEvent, FeedError> {
        loop {
            let msg = self.socket.recv().await.map_err(|e| FeedError::Recv {
                reason: e.to_string(),
            })?;

            match decode_frames(msg.into_vec()) {
                Ok(event) => return Ok(event),
                Err(e) => {
                    debug!(error = %e, "dropping malformed feed delivery");
                }
            }
        }
    }
}

/// Validate and decode one multipart delivery into a `FeedEvent`.
fn decode_frames(frames: Vec<Bytes>) -> Result<FeedEvent, FeedError> {
    if frames.len() < 2 {
        return Err(FeedError::Malformed {
            reason: format!("expected at least 2 frames, got {}", frames.len()),
        });
    }

    let topic = std::str::from_utf8(&frames[0]).map_err(|_| FeedError::Malformed {
        reason: "topic frame is not UTF-8".into(),
    })?;

    Ok(FeedEvent::new(topic, frames[1].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_two_frames() {
        let frames = vec![Bytes::from_static(b"hashtx"), Bytes::from_static(b"\xab\x12")];
        let event = decode_frames(frames).unwrap();
        assert_eq!(event.topic, "hashtx");
        assert_eq!(event.payload.as_ref(), b"\xab\x12");
    }

    #[test]
    fn decode_ignores_trailing_sequence_frame() {
        let frames = vec![
            Bytes::from_static(b"hashblock"),
            Bytes::from_static(b"\x00\x01"),
            Bytes::from_static(b"\x07\x00\x00\x00"),
        ];
        let event = decode_frames(frames).unwrap();
        assert_eq!(event.topic, "hashblock");
        assert_eq!(event.payload.as_ref(), b"\x00\x01");
    }

    #[test]
    fn decode_rejects_single_frame() {
        let err = decode_frames(vec![Bytes::from_static(b"hashtx")]).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn decode_rejects_non_utf8_topic() {
        let frames = vec![Bytes::from_static(b"\xff\xfe"), Bytes::from_static(b"ok")];
        let err = decode_frames(frames).unwrap_err();
        assert!(matches!(err, FeedError::Malformed { .. }));
    }
}
