//! Flow checkpoints.
//!
//! A checkpoint is written immediately before each suspension point and
//! removed when the instance terminates. It carries exactly what re-entry
//! needs: the stage, the session to re-attach (if suspended on the
//! counterparty), and the partially signed transaction. Completed steps are
//! never re-executed from a checkpoint.

use serde::{Deserialize, Serialize};
use shared_types::{FlowId, MessageRecord, SessionId, SignedTransaction};

use crate::error::FlowError;

/// Which suspension point the instance is parked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointStage {
    /// Suspended on the counterparty round trip. The proposal has already
    /// been sent over the session; re-entry re-attaches and awaits the
    /// reply without resending.
    AwaitingCounterparty {
        session_id: SessionId,
        transaction: SignedTransaction,
    },
    /// Suspended on the notary round trip. Both participant signatures are
    /// present; re-entry re-runs only the finalize call.
    Finalizing { transaction: SignedTransaction },
}

/// Persistent state of one suspended flow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCheckpoint {
    /// The instance this checkpoint belongs to. Only that instance may
    /// write it.
    pub flow_id: FlowId,
    /// The record the flow is carrying.
    pub record: MessageRecord,
    /// Where to re-enter.
    pub stage: CheckpointStage,
}

impl FlowCheckpoint {
    /// Encode for the checkpoint store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FlowError> {
        bincode::serialize(self).map_err(|e| FlowError::CheckpointStore {
            reason: e.to_string(),
        })
    }

    /// Decode a stored checkpoint.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FlowError> {
        bincode::deserialize(bytes).map_err(|e| FlowError::CheckpointStore {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_01_transaction::TransactionBuilder;
    use shared_types::Keypair;

    fn checkpoint() -> FlowCheckpoint {
        let sender = Keypair::generate();
        let recipient = Keypair::generate();
        let notary = Keypair::generate().party("O=Notary,L=London,C=GB");
        let record = MessageRecord::new(
            sender.party("O=PartyA,L=London,C=GB"),
            recipient.party("O=PartyB,L=New York,C=US"),
            "hello there",
        );
        let mut stx =
            SignedTransaction::new(TransactionBuilder::build(record.clone(), notary));
        let id = stx.id();
        stx.add_signature(shared_types::PartySignature {
            by: sender.public_key(),
            signature: sender.sign(&id.0),
        });
        FlowCheckpoint {
            flow_id: FlowId::fresh(),
            record,
            stage: CheckpointStage::AwaitingCounterparty {
                session_id: SessionId::fresh(),
                transaction: stx,
            },
        }
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let original = checkpoint();
        let bytes = original.to_bytes().expect("encode");
        let decoded = FlowCheckpoint::from_bytes(&bytes).expect("decode");

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let result = FlowCheckpoint::from_bytes(&[0xFF, 0x01, 0x02]);
        assert!(matches!(result, Err(FlowError::CheckpointStore { .. })));
    }
}
