//! Driven Ports (SPI - Outbound Dependencies).

use async_trait::async_trait;
use shared_types::{
    CommittedTransaction, FlowId, MessageRecord, NotaryRejection, PartyId, PartySignature,
    RecordType, SignedTransaction,
};

use crate::error::FinalityResult;

/// The round trip to the ordering authority.
#[async_trait]
pub trait NotaryClient: Send + Sync {
    /// Ask the notary to attest and sign `transaction`.
    async fn request_signature(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<PartySignature, NotaryRejection>;
}

/// The canonical ledger, owned by the ledger node.
///
/// Commit is the only mutating entry point and the finality service is its
/// only caller; everything else reads. The ledger emits exactly one update
/// on its feed per first-time commit and deduplicates by transaction id.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Commit a notarized transaction.
    async fn commit(
        &self,
        transaction: &CommittedTransaction,
        flow_id: FlowId,
    ) -> FinalityResult<()>;

    /// One-shot snapshot of the unconsumed records of a type.
    ///
    /// This is the separate historical query; it is never merged into the
    /// live update feed.
    async fn unconsumed_records(&self, record_type: RecordType) -> Vec<MessageRecord>;
}

/// Distribution of committed transactions to participants.
#[async_trait]
pub trait ParticipantDelivery: Send + Sync {
    /// Deliver a committed transaction to one participant.
    ///
    /// Delivery is at-least-once; receivers deduplicate by transaction id.
    async fn deliver(
        &self,
        participant: &PartyId,
        transaction: &CommittedTransaction,
    ) -> Result<(), String>;
}
