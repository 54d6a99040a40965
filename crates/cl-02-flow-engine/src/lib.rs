//! # cl-02-flow-engine
//!
//! Flow engine for the signature-collection protocol.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Initiator flow**: the explicit state machine that builds, validates,
//!   signs, collects the counterparty signature, and finalizes a transaction
//! - **Responder service**: the reactive side that re-validates proposals
//!   and signs or rejects them
//! - **Checkpoint/resume**: every suspension point persists enough state
//!   that an instance survives a process restart without resending
//!   completed steps
//! - **Cancellation**: cooperative, allowed only before notarization begins
//!
//! ## State Machine
//!
//! ```text
//! CREATING → VERIFYING → SIGNING → AWAITING_COUNTERPARTY
//!                                          │
//!                                          ▼
//!                       COUNTERPARTY_SIGNED → FINALIZING → DONE
//!
//! (FAILED is reachable from every state)
//! ```
//!
//! Suspension points are the two network round trips: awaiting the
//! counterparty and awaiting the notary. All other steps are synchronous
//! local computation. Each flow instance runs as its own task; instances
//! share nothing but the ledger and the checkpoint store.

pub mod domain;
pub mod error;
pub mod ports;
pub mod responder;
pub mod service;

pub use domain::checkpoint::{CheckpointStage, FlowCheckpoint};
pub use domain::progress::{ProgressStep, ProgressTracker};
pub use domain::state::FlowStage;
pub use error::FlowError;
pub use ports::outbound::{
    CheckpointStore, FinalityGateway, FlowSession, IncomingSession, PartyDirectory,
    SessionAcceptor, SessionTransport, TransactionSigner,
};
pub use responder::ResponderService;
pub use service::{FlowEngine, FlowEngineConfig, FlowHandle};
