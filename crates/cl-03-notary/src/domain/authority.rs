//! Notary authority.
//!
//! The trusted third party that attests a transaction's inputs are
//! unconsumed. It keeps the index of every state reference it has seen
//! spent, re-verifies every required signature itself, and signs last.

use parking_lot::RwLock;
use std::collections::HashMap;

use shared_types::{
    Keypair, NotaryRejection, PartyId, PartySignature, SignedTransaction, StateRef, TransactionId,
};
use tracing::{debug, info};

/// An in-process ordering authority.
pub struct NotaryAuthority {
    identity: PartyId,
    keypair: Keypair,
    /// Every input ever consumed, mapped to the transaction that spent it.
    consumed: RwLock<HashMap<StateRef, TransactionId>>,
}

impl NotaryAuthority {
    /// Create a notary with the given name and signing key.
    pub fn new(name: impl Into<String>, keypair: Keypair) -> Self {
        let identity = keypair.party(name);
        Self {
            identity,
            keypair,
            consumed: RwLock::new(HashMap::new()),
        }
    }

    /// This notary's network identity.
    #[must_use]
    pub fn identity(&self) -> PartyId {
        self.identity.clone()
    }

    /// Notarize a fully signed transaction.
    ///
    /// Verification order: every required signature first (none of the
    /// submitters is trusted), then the consumed-ref index. Marking inputs
    /// spent and the conflict check happen under one lock, so two
    /// conflicting transactions can never both pass.
    ///
    /// Re-submission of an already notarized transaction id succeeds and
    /// returns a fresh signature; delivery upstream is at-least-once.
    pub fn sign_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<PartySignature, NotaryRejection> {
        let id = transaction.id();

        for key in transaction.content.required_signers() {
            transaction.verify_signature_of(&key).map_err(|_| {
                NotaryRejection::SignatureMismatch {
                    by: hex::encode(key),
                }
            })?;
        }

        {
            let mut consumed = self.consumed.write();
            for input in &transaction.content.inputs {
                match consumed.get(input) {
                    Some(spender) if *spender != id => {
                        info!(
                            tx_id = %id,
                            conflicting = ?input,
                            "Rejecting double spend"
                        );
                        return Err(NotaryRejection::DoubleSpend {
                            conflicting_ref: *input,
                        });
                    }
                    _ => {}
                }
            }
            for input in &transaction.content.inputs {
                consumed.insert(*input, id);
            }
        }

        debug!(tx_id = %id, "Notary signature issued");
        Ok(PartySignature {
            by: self.keypair.public_key(),
            signature: self.keypair.sign(&id.0),
        })
    }

    /// How many state references this notary has recorded as spent.
    #[must_use]
    pub fn consumed_count(&self) -> usize {
        self.consumed.read().len()
    }
}
