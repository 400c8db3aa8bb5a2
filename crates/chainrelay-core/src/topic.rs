//! Feed topic identifiers.
//!
//! The node publishes two notification topics over its pub/sub socket:
//! `hashtx` carries raw transaction-hash bytes, `hashblock` carries raw
//! block-hash bytes. The set is fixed at startup; anything else arriving on
//! the socket is ignored by the relay.

/// A feed category the relay subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// New transaction hash (`hashtx`).
    HashTx,
    /// New block hash (`hashblock`).
    HashBlock,
}

impl Topic {
    /// Every topic the relay subscribes to.
    pub const ALL: [Topic; 2] = [Topic::HashTx, Topic::HashBlock];

    /// The UTF-8 topic string as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashTx => "hashtx",
            Self::HashBlock => "hashblock",
        }
    }

    /// Map a wire topic string back to a `Topic`.
    /// Returns `None` for unrecognized topics.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "hashtx" => Some(Self::HashTx),
            "hashblock" => Some(Self::HashBlock),
            _ => None,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
