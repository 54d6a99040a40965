//! Error types for the finality subsystem.

use shared_types::NotaryRejection;
use thiserror::Error;

/// Finality subsystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalityError {
    /// The transaction is missing required signatures.
    #[error("Not sufficiently signed: missing {missing:?}")]
    NotSufficientlySigned {
        /// Hex encodings of the keys that have not signed.
        missing: Vec<String>,
    },

    /// A collected signature did not verify locally.
    #[error("Invalid signature from {by}")]
    InvalidSignature { by: String },

    /// The notary refused to sign.
    #[error(transparent)]
    Rejected(#[from] NotaryRejection),

    /// The notary round trip did not complete within its bound.
    #[error("Timed out waiting for the notary")]
    Timeout,

    /// The ledger gateway failed to commit.
    #[error("Ledger commit failed: {reason}")]
    Ledger { reason: String },
}

/// Result type for finality operations.
pub type FinalityResult<T> = Result<T, FinalityError>;
