//! # chainrelay-core
//!
//! Core types and trait seams for ChainRelay:
//! - [`topic`] — the fixed set of feed topics (`hashtx`, `hashblock`)
//! - [`feed`] — the `TopicFeed` pull seam over the raw pub/sub socket
//! - [`notify`] — typed relay events and the notifier registry
//! - [`indexer`] — the `IndexingApi` seam and the parsed-block data model
//! - [`error`] — error types shared across the relay layers
//!
//! This crate is transport-agnostic: the ZeroMQ adapter, the HTTP RPC client
//! and the WebSocket surface all live in sibling crates and plug into the
//! seams defined here.

pub mod error;
pub mod feed;
pub mod indexer;
pub mod notify;
pub mod topic;

pub use error::{FeedError, NotifyError, RpcError};
pub use feed::{FeedEvent, TopicFeed};
pub use indexer::{IndexingApi, LastBlock, ParsedBlock, ProtocolMessage, RunningInfo};
pub use notify::{EventKind, Notifier, NotifierRegistry, RelayEvent};
pub use topic::Topic;
