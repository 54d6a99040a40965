//! Driven Ports (SPI - Outbound Dependencies).
//!
//! Everything the flow engine needs from the outside world, as trait
//! contracts. The transport and the party directory are external
//! collaborators; the runtime wires concrete adapters behind these traits.

use async_trait::async_trait;
use shared_types::{
    CommittedTransaction, FlowId, PartyId, PartySignature, PublicKey, SessionId, SessionMessage,
    SignedTransaction, TransactionId,
};

use crate::error::FlowError;

/// One side of an open flow session.
///
/// The channel is reliable and ordered; delivery is at-least-once, so
/// receivers must tolerate duplicates of their own replies. A session
/// belongs to exactly one flow instance and is never reused.
#[async_trait]
pub trait FlowSession: Send {
    /// The transport-assigned session id, stable across re-attachment.
    fn id(&self) -> SessionId;

    /// Send a message to the peer.
    async fn send(&mut self, message: SessionMessage) -> Result<(), FlowError>;

    /// Await the next message from the peer.
    ///
    /// Returns `FlowError::SessionClosed` once the peer has released the
    /// session.
    async fn recv(&mut self) -> Result<SessionMessage, FlowError>;

    /// Release the session. Idempotent.
    async fn close(&mut self);
}

/// An accepted session together with the initiating party.
pub struct IncomingSession {
    /// Who opened the session.
    pub initiator: PartyId,
    /// The responder's end of the channel.
    pub session: Box<dyn FlowSession>,
}

/// Session layer between named parties: reliable, ordered, at-least-once
/// point-to-point delivery with open/close semantics.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Open a fresh session to `counterparty`.
    async fn open(&self, counterparty: &PartyId) -> Result<Box<dyn FlowSession>, FlowError>;

    /// Re-attach to a session persisted in a checkpoint.
    ///
    /// Used on resume so a suspended instance can keep waiting for the
    /// reply without resending its request.
    async fn reattach(&self, session_id: SessionId) -> Result<Box<dyn FlowSession>, FlowError>;
}

/// The responder-side half of the session layer.
#[async_trait]
pub trait SessionAcceptor: Send + Sync {
    /// Await the next inbound session.
    ///
    /// Returns `None` when the transport has shut down.
    async fn accept(&self) -> Option<IncomingSession>;
}

/// Access to the node's own signing key.
pub trait TransactionSigner: Send + Sync {
    /// The key this node signs with.
    fn public_key(&self) -> PublicKey;

    /// Sign a transaction id.
    fn sign(&self, tx_id: &TransactionId) -> PartySignature;
}

/// Persistence for flow checkpoints.
///
/// The store holds opaque encoded blobs keyed by flow id. Writes for
/// different instances may race freely; only the owning instance writes a
/// given key.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist (or overwrite) the checkpoint for `flow_id`.
    async fn save(&self, flow_id: FlowId, blob: Vec<u8>) -> Result<(), FlowError>;

    /// Load every persisted checkpoint.
    async fn load_all(&self) -> Result<Vec<(FlowId, Vec<u8>)>, FlowError>;

    /// Remove the checkpoint for `flow_id`. Removing a missing key is not
    /// an error.
    async fn remove(&self, flow_id: FlowId) -> Result<(), FlowError>;
}

/// Resolution of party names to identities.
pub trait PartyDirectory: Send + Sync {
    /// Look up a well-known party by its exact name.
    fn resolve_by_name(&self, name: &str) -> Result<PartyId, FlowError>;
}

/// Entry into the notarization and finality subsystem.
#[async_trait]
pub trait FinalityGateway: Send + Sync {
    /// Submit a fully signed transaction for notarization and commit.
    async fn finalize(
        &self,
        transaction: SignedTransaction,
        flow_id: FlowId,
    ) -> Result<CommittedTransaction, FlowError>;
}
