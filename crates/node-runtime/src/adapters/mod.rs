//! In-process adapters for every outbound port.
//!
//! Each adapter stands where a real deployment would put a network client
//! or a persistent store; the port contracts are identical either way.

pub mod checkpoints;
pub mod directory;
pub mod finality;
pub mod keystore;
pub mod ledger;
pub mod transport;

pub use checkpoints::InMemoryCheckpointStore;
pub use directory::InMemoryDirectory;
pub use finality::{FinalityAdapter, InProcessNotaryClient, VaultDelivery};
pub use keystore::NodeKeystore;
pub use ledger::{InMemoryLedger, NodeVault};
pub use transport::{InProcessHub, NodeTransport};
