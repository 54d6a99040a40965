//! Driving Ports (API - Inbound).

use async_trait::async_trait;
use shared_types::{CommittedTransaction, FlowId, SignedTransaction};

use crate::error::FinalityResult;

/// The finality operation offered to the flow engine.
#[async_trait]
pub trait FinalityApi: Send + Sync {
    /// Notarize a fully signed transaction, commit it, and distribute it
    /// to the participants.
    ///
    /// The notary is consulted exactly once per call. Success is
    /// irrevocable.
    async fn finalize(
        &self,
        transaction: SignedTransaction,
        flow_id: FlowId,
    ) -> FinalityResult<CommittedTransaction>;
}
