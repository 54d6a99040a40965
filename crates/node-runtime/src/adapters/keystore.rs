//! Node keystore.

use cl_02_flow_engine::TransactionSigner;
use shared_types::{Keypair, PartyId, PartySignature, PublicKey, TransactionId};

/// Holds the node's signing key and produces transaction signatures.
pub struct NodeKeystore {
    keypair: Keypair,
    identity: PartyId,
}

impl NodeKeystore {
    /// Create a keystore with a freshly generated key.
    #[must_use]
    pub fn generate(name: impl Into<String>) -> Self {
        let keypair = Keypair::generate();
        let identity = keypair.party(name);
        Self { keypair, identity }
    }

    /// The identity backed by this keystore.
    #[must_use]
    pub fn identity(&self) -> PartyId {
        self.identity.clone()
    }
}

impl TransactionSigner for NodeKeystore {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign(&self, tx_id: &TransactionId) -> PartySignature {
        PartySignature {
            by: self.keypair.public_key(),
            signature: self.keypair.sign(&tx_id.0),
        }
    }
}
