//! # Party Identities
//!
//! Ed25519-backed identities for the parties of the protocol. A party is a
//! legal name plus the public key it signs transactions with; the notary is
//! an ordinary party that happens to provide the ordering service.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// Errors from signature operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The key bytes do not form a valid curve point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// The signature does not verify against the key and message.
    #[error("Signature verification failed for key {by}")]
    VerificationFailed { by: String },
}

/// A well-known party on the network.
///
/// Identified by an X.500-style name (e.g. `"O=PartyA,L=London,C=GB"`) and
/// the Ed25519 key it owns. Two parties are equal only if both name and key
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId {
    /// The party's legal name.
    pub name: String,
    /// The key this party signs with.
    pub owning_key: PublicKey,
}

impl PartyId {
    /// Create a party identity from a name and owning key.
    pub fn new(name: impl Into<String>, owning_key: PublicKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A party's signing keypair.
///
/// Held only by the node that owns the identity; everything that crosses a
/// crate boundary carries the public key alone.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// The public half of this keypair.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The party identity this keypair backs.
    #[must_use]
    pub fn party(&self, name: impl Into<String>) -> PartyId {
        PartyId::new(name, self.public_key())
    }

    /// Sign a message (deterministic, no RNG needed).
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify an Ed25519 signature over a message.
pub fn verify_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(key).map_err(|_| SignatureError::InvalidPublicKey)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| SignatureError::VerificationFailed {
            by: hex::encode(key),
        })
}
