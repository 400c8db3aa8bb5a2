//! # chainrelay-rpc
//!
//! JSON-RPC 2.0 wire types and the HTTP client for the indexing service.
//!
//! The client implements [`chainrelay_core::IndexingApi`] and deliberately
//! performs no internal retry: the block-confirmation waiter owns the retry
//! policy, so every call here is a single request/response exchange.

pub mod client;
pub mod request;

pub use client::HttpIndexingClient;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
