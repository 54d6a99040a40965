//! Error types for transaction validation.

use thiserror::Error;

/// A structural rule of the message contract was broken.
///
/// Always a local, non-retriable rejection; the reason string names the rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Contract violation: {reason}")]
pub struct ContractViolation {
    /// The rule that failed.
    pub reason: String,
}

impl ContractViolation {
    pub(crate) fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_owned(),
        }
    }
}
