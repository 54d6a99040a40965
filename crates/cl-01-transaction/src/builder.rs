//! Transaction Builder.
//!
//! Assembles the single supported transaction shape: no inputs, one message
//! record output, one `Send` command requiring both participants' keys.

use shared_types::{Command, MessageRecord, OutputState, PartyId, UnsignedTransaction};

use crate::contract::MessageContract;

/// Builds unsigned `Send` transactions. Pure assembly; building never fails.
pub struct TransactionBuilder;

impl TransactionBuilder {
    /// Assemble an unsigned transaction carrying `record`, to be finalized
    /// by `notary`.
    ///
    /// The command's required signers are the record's participants
    /// (sender and recipient), in set order.
    #[must_use]
    pub fn build(record: MessageRecord, notary: PartyId) -> UnsignedTransaction {
        let required_signers = record.participant_keys().into_iter().collect();
        UnsignedTransaction {
            inputs: Vec::new(),
            outputs: vec![OutputState {
                record,
                contract_id: MessageContract::CONTRACT_ID.to_owned(),
            }],
            commands: vec![Command::send(required_signers)],
            notary,
        }
    }
}
