//! # Courier-Ledger Node Runtime
//!
//! Wires the subsystems into a runnable node and exposes the external
//! surface (`post`, `updates`, `snapshot`).
//!
//! ## Architecture
//!
//! ```text
//! post(record) ──→ [Flow Engine (cl-02)] ──build/validate──→ [cl-01]
//!                        │
//!                        ├──session──→ counterparty responder
//!                        │
//!                        └──finalize──→ [Finality (cl-03)] ──→ [Ledger]
//!                                                                 │
//!                                                           ordered feed
//!                                                                 │
//! updates() ←───────────── [Update Bridge (cl-04)] ←──────────────┘
//! ```
//!
//! ## Modular Structure
//!
//! - `adapters/` - In-process implementations of every outbound port
//! - `config.rs` - Explicit node configuration (identities, timeouts)
//! - `network.rs` - In-process network: transport hub, notary, ledger,
//!   bridge, and node construction
//! - `node.rs` - The per-party facade exposed to external collaborators

pub mod adapters;
pub mod config;
pub mod network;
pub mod node;

pub use config::{NetworkConfig, NodeConfig};
pub use network::InProcessNetwork;
pub use node::{Node, PostMessage};
