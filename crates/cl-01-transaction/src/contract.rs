//! Message Contract.
//!
//! Structural validation for `Send` transactions. Deterministic and
//! side-effect free: every signing party re-runs the same checks and must
//! reach the same verdict, so nothing here may consult local state.

use shared_types::{CommandTag, UnsignedTransaction};

use crate::error::ContractViolation;

/// The contract governing message records.
pub struct MessageContract;

impl MessageContract {
    /// Contract id stamped on every output this contract validates.
    pub const CONTRACT_ID: &'static str = "courier.MessageContract";

    /// Validate a proposed transaction against the `Send` rules.
    ///
    /// Rules:
    /// - exactly one `Send` command is attached,
    /// - no inputs are consumed,
    /// - exactly one output record is created,
    /// - the output's participants are exactly the required signers.
    pub fn validate(tx: &UnsignedTransaction) -> Result<(), ContractViolation> {
        let mut commands = tx.commands.iter().filter(|c| c.tag == CommandTag::Send);
        let command = commands
            .next()
            .ok_or_else(|| ContractViolation::new("A Send command must be present."))?;
        if commands.next().is_some() {
            return Err(ContractViolation::new(
                "Only one Send command may be attached.",
            ));
        }

        if !tx.inputs.is_empty() {
            return Err(ContractViolation::new(
                "No inputs should be consumed when sending a message.",
            ));
        }
        if tx.outputs.len() != 1 {
            return Err(ContractViolation::new(
                "Only one output state should be created when sending a message.",
            ));
        }

        let record = &tx.outputs[0].record;
        let participant_keys = record.participant_keys();
        let signer_keys = command.required_signers.iter().copied().collect();
        if participant_keys != signer_keys {
            return Err(ContractViolation::new(
                "The message's participants must be the required signers.",
            ));
        }

        Ok(())
    }
}
