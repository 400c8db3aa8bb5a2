//! # chainrelay-zmq
//!
//! ZeroMQ SUB adapter implementing the [`chainrelay_core::TopicFeed`] seam
//! over a node's notification socket.

pub mod sub;

pub use sub::ZmqFeed;
