//! Finality wiring: notary client, participant delivery, and the gateway
//! the flow engine drives.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use cl_02_flow_engine::{FinalityGateway, FlowError};
use cl_03_notary::{
    FinalityApi, FinalityError, FinalityService, NotaryAuthority, NotaryClient,
    ParticipantDelivery,
};
use shared_types::{
    CommittedTransaction, FlowId, NotaryRejection, PartyId, PartySignature, SignedTransaction,
};

use crate::adapters::ledger::{InMemoryLedger, NodeVault};

/// Direct call into an in-process ordering authority.
///
/// The round trip is still performed once per transaction; only the wire
/// is missing.
pub struct InProcessNotaryClient {
    authority: Arc<NotaryAuthority>,
}

impl InProcessNotaryClient {
    /// Wrap an authority.
    #[must_use]
    pub fn new(authority: Arc<NotaryAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl NotaryClient for InProcessNotaryClient {
    async fn request_signature(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<PartySignature, NotaryRejection> {
        self.authority.sign_transaction(transaction)
    }
}

/// Delivers committed transactions into participants' vaults.
#[derive(Default)]
pub struct VaultDelivery {
    vaults: RwLock<HashMap<String, Arc<NodeVault>>>,
}

impl VaultDelivery {
    /// Create an empty delivery table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant's vault under its party name.
    pub fn register(&self, name: impl Into<String>, vault: Arc<NodeVault>) {
        self.vaults.write().insert(name.into(), vault);
    }
}

#[async_trait]
impl ParticipantDelivery for VaultDelivery {
    async fn deliver(
        &self,
        participant: &PartyId,
        transaction: &CommittedTransaction,
    ) -> Result<(), String> {
        let vault = self
            .vaults
            .read()
            .get(&participant.name)
            .cloned()
            .ok_or_else(|| format!("no vault registered for {}", participant.name))?;
        vault.apply(transaction);
        debug!(participant = %participant, tx_id = %transaction.id(), "Delivered");
        Ok(())
    }
}

/// The flow engine's entry into the finality subsystem.
pub struct FinalityAdapter {
    service: FinalityService<InProcessNotaryClient, InMemoryLedger, VaultDelivery>,
}

impl FinalityAdapter {
    /// Wrap a finality service.
    #[must_use]
    pub fn new(
        service: FinalityService<InProcessNotaryClient, InMemoryLedger, VaultDelivery>,
    ) -> Self {
        Self { service }
    }
}

#[async_trait]
impl FinalityGateway for FinalityAdapter {
    async fn finalize(
        &self,
        transaction: SignedTransaction,
        flow_id: FlowId,
    ) -> Result<CommittedTransaction, FlowError> {
        self.service
            .finalize(transaction, flow_id)
            .await
            .map_err(|error| match error {
                FinalityError::Rejected(rejection) => FlowError::NotaryRejection(rejection),
                FinalityError::Timeout => FlowError::Timeout {
                    waiting_for: "notary signature".into(),
                },
                other => FlowError::Finality {
                    reason: other.to_string(),
                },
            })
    }
}
