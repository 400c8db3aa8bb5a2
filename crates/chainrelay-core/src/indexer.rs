//! `IndexingApi` seam and the parsed-block data model.
//!
//! The indexing service is an external, eventually-consistent system that
//! parses blocks into protocol-level messages. The relay only needs two of
//! its RPCs: a no-argument status call and a per-block message fetch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// The latest block the indexing service has processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastBlock {
    pub block_index: u64,
    pub block_hash: String,
}

/// Status reported by `get_running_info`.
///
/// `last_block` is absent while the service is starting up; the
/// confirmation waiter treats that as a mismatch, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunningInfo {
    #[serde(default)]
    pub last_block: Option<LastBlock>,
}

/// One protocol-level message attached to a parsed block.
///
/// Messages are open JSON objects; the relay never interprets them beyond
/// the best-effort `bindings` decode below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolMessage(pub Value);

impl ProtocolMessage {
    /// Decode the `bindings` field best-effort.
    ///
    /// If `bindings` is a string holding valid JSON, it is replaced with the
    /// parsed structure. On parse failure (or if the field is absent or
    /// already structured) the message is returned unmodified — malformed
    /// bindings are never an error and never drop the message. Idempotent.
    pub fn decode_bindings(mut self) -> Self {
        if let Some(obj) = self.0.as_object_mut() {
            let parsed = match obj.get("bindings") {
                Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok(),
                _ => None,
            };
            if let Some(parsed) = parsed {
                obj.insert("bindings".into(), parsed);
            }
        }
        self
    }
}

/// One block result from `get_blocks`, carrying its parsed messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedBlock {
    #[serde(default)]
    pub block_index: Option<u64>,
    #[serde(rename = "_messages", default)]
    pub messages: Vec<ProtocolMessage>,
}

/// The two indexing-service RPCs the relay consumes.
#[async_trait]
pub trait IndexingApi: Send + Sync {
    /// `get_running_info()` — current service status.
    async fn running_info(&self) -> Result<RunningInfo, RpcError>;

    /// `get_blocks({block_indexes})` — parsed messages per block index.
    async fn blocks(&self, block_indexes: &[u64]) -> Result<Vec<ParsedBlock>, RpcError>;
}
