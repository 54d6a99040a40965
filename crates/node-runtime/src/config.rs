//! Node and network configuration.
//!
//! Identities and timeouts are passed in explicitly at construction; no
//! subsystem reads ambient global state.

use std::time::Duration;

/// Configuration for one party node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// The node's X.500-style legal name.
    pub name: String,
    /// Bound on the counterparty round trip.
    pub counterparty_timeout: Duration,
    /// Bound on the notary round trip.
    pub notary_timeout: Duration,
    /// Delivery attempts per participant when distributing a committed
    /// transaction.
    pub delivery_attempts: u32,
}

impl NodeConfig {
    /// Sensible defaults for a named node.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counterparty_timeout: Duration::from_secs(30),
            notary_timeout: Duration::from_secs(30),
            delivery_attempts: 3,
        }
    }
}

/// Configuration for the in-process network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// The ordering authority's legal name.
    pub notary_name: String,
    /// Per-subscriber update buffer before an overrun is declared.
    pub update_buffer: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            notary_name: "O=Notary,L=London,C=GB".into(),
            update_buffer: cl_04_update_bridge::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
