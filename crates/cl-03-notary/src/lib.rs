//! # cl-03-notary
//!
//! Notarization and finality.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Finality Service**: checks the fully-signed invariant, performs the
//!   single notary round trip, commits through the single-writer ledger
//!   gateway, and distributes the committed transaction to participants
//! - **Notary Authority**: the ordering authority's own domain logic:
//!   signature re-verification, a consumed-ref index, and double-spend
//!   detection
//!
//! ```text
//! fully signed tx ──→ [Finality Service] ──request──→ [Notary Authority]
//!                            │                              │
//!                            │←──────── signature ──────────┘
//!                            ▼
//!                     [Ledger commit]  (single writer, exactly once)
//!                            │
//!                            ▼
//!                  participants (at-least-once delivery)
//! ```
//!
//! Everything before the notary signature is abandonable; nothing after it
//! is.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::authority::NotaryAuthority;
pub use error::{FinalityError, FinalityResult};
pub use ports::inbound::FinalityApi;
pub use ports::outbound::{LedgerGateway, NotaryClient, ParticipantDelivery};
pub use service::{FinalityConfig, FinalityService};
