//! Error types for the flow engine.

use cl_01_transaction::ContractViolation;
use shared_types::NotaryRejection;
use thiserror::Error;

/// Failures a flow instance can terminate with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The proposed transaction broke a contract rule.
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),

    /// Party name resolution failed.
    #[error("Unknown party name: {name}")]
    UnknownParty { name: String },

    /// The counterparty explicitly refused to sign.
    #[error("Counterparty rejected the proposal: {reason}")]
    CounterpartyRejected { reason: String },

    /// A round trip did not complete within its bound.
    #[error("Timed out waiting for {waiting_for}")]
    Timeout { waiting_for: String },

    /// The notary refused the transaction.
    #[error(transparent)]
    NotaryRejection(#[from] NotaryRejection),

    /// A collected signature did not verify.
    #[error("Invalid signature from {by}")]
    InvalidSignature { by: String },

    /// The session ended before the protocol completed.
    #[error("Session closed by peer")]
    SessionClosed,

    /// The peer sent a message the protocol does not allow here.
    #[error("Unexpected session message: {got}")]
    UnexpectedMessage { got: String },

    /// The checkpoint store failed to persist or recover state.
    #[error("Checkpoint store failure: {reason}")]
    CheckpointStore { reason: String },

    /// No instance with the given id is registered.
    #[error("Unknown flow id: {flow_id}")]
    UnknownFlow { flow_id: String },

    /// The instance was cancelled before notarization.
    #[error("Flow cancelled")]
    Cancelled,

    /// Cancellation was requested after notarization began.
    #[error("Cancellation denied: flow already reached {stage}")]
    CancellationDenied { stage: String },

    /// The finality service failed for a reason other than a notary verdict.
    #[error("Finality failure: {reason}")]
    Finality { reason: String },
}
