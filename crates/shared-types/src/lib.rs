//! # Shared Types Crate
//!
//! This crate contains all domain entities, party identities, and wire
//! message types shared across the Courier-Ledger subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Closed Encodings**: Every polymorphic surface is a closed tagged enum
//!   with an explicit discriminator; there is no reflective serialization.
//! - **Immutable Entities**: Records, commands, and committed transactions
//!   are never mutated after construction.

pub mod entities;
pub mod errors;
pub mod identity;

pub use entities::*;
pub use errors::*;
pub use identity::*;
