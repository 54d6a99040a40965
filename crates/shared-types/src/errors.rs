//! # Shared Error Types
//!
//! Errors that cross subsystem boundaries. Per-subsystem failures live in
//! each crate's own `error` module; the notary's verdict is shared because
//! both the finality service and the flow engine surface it verbatim.

use crate::entities::StateRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The notary refused to sign a transaction.
///
/// Fatal to the flow; surfaced to the initiator without rewording.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum NotaryRejection {
    /// An input was already consumed by an earlier transaction.
    #[error("Double spend: input {conflicting_ref:?} already consumed")]
    DoubleSpend {
        /// The first input found to conflict.
        conflicting_ref: StateRef,
    },

    /// A required signature was missing or did not verify.
    #[error("Signature mismatch for key {by}")]
    SignatureMismatch {
        /// Hex encoding of the offending key.
        by: String,
    },
}
