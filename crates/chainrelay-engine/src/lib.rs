//! # chainrelay-engine
//!
//! The relay loop and the per-block confirmation state machine.
//!
//! [`RelayEngine`] consumes the topic feed: transaction and block hashes fan
//! out through the notifier registry immediately, and every block hash
//! additionally spawns a [`confirm::ConfirmationWaiter`] task that polls the
//! indexing service until the block is parsed, then delivers its protocol
//! messages under a distinct event kind.

pub mod config;
pub mod confirm;
pub mod relay;

pub use config::{BackoffConfig, ConfirmConfig};
pub use confirm::{ConfirmError, ConfirmationWaiter};
pub use relay::RelayEngine;
