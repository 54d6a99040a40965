//! Finality Service - Core business logic.
//!
//! The single writer of the ledger. Checks the fully-signed invariant and
//! every collected signature before the round trip, consults the notary
//! exactly once, commits exactly once, then distributes the committed
//! transaction to every participant at-least-once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use shared_types::{CommittedTransaction, FlowId, SignedTransaction};

use crate::error::{FinalityError, FinalityResult};
use crate::ports::inbound::FinalityApi;
use crate::ports::outbound::{LedgerGateway, NotaryClient, ParticipantDelivery};

/// Finality configuration.
#[derive(Clone, Debug)]
pub struct FinalityConfig {
    /// Bound on the notary round trip.
    pub notary_timeout: Duration,
    /// Delivery attempts per participant before giving up.
    pub delivery_attempts: u32,
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            notary_timeout: Duration::from_secs(30),
            delivery_attempts: 3,
        }
    }
}

/// Finality Service implementation.
pub struct FinalityService<N, L, D>
where
    N: NotaryClient,
    L: LedgerGateway,
    D: ParticipantDelivery,
{
    config: FinalityConfig,
    notary: Arc<N>,
    ledger: Arc<L>,
    delivery: Arc<D>,
}

impl<N, L, D> FinalityService<N, L, D>
where
    N: NotaryClient,
    L: LedgerGateway,
    D: ParticipantDelivery,
{
    /// Create a new finality service.
    pub fn new(config: FinalityConfig, notary: Arc<N>, ledger: Arc<L>, delivery: Arc<D>) -> Self {
        Self {
            config,
            notary,
            ledger,
            delivery,
        }
    }

    /// Fail fast before consulting the notary: every required key must
    /// have signed, and every collected signature must verify in the
    /// order it was applied.
    fn check_fully_signed(transaction: &SignedTransaction) -> FinalityResult<()> {
        let missing = transaction.missing_signers();
        if !missing.is_empty() {
            return Err(FinalityError::NotSufficientlySigned {
                missing: missing.iter().map(hex::encode).collect(),
            });
        }
        transaction
            .verify_signatures()
            .map_err(|error| FinalityError::InvalidSignature {
                by: error.to_string(),
            })
    }

    /// Distribute a committed transaction to all participants.
    ///
    /// Finality is already irrevocable here, so distribution failures are
    /// logged rather than unwound; every participant store deduplicates by
    /// transaction id, so retries are safe.
    async fn distribute(&self, committed: &CommittedTransaction) {
        let participants: Vec<_> = committed
            .transaction
            .content
            .outputs
            .iter()
            .flat_map(|output| output.record.participants())
            .cloned()
            .collect();

        for participant in participants {
            let mut delivered = false;
            for attempt in 1..=self.config.delivery_attempts {
                match self.delivery.deliver(&participant, committed).await {
                    Ok(()) => {
                        delivered = true;
                        break;
                    }
                    Err(reason) => {
                        warn!(
                            participant = %participant,
                            attempt,
                            reason = %reason,
                            "Delivery attempt failed"
                        );
                    }
                }
            }
            if !delivered {
                warn!(
                    participant = %participant,
                    tx_id = %committed.id(),
                    "Giving up delivery; participant must catch up from the ledger"
                );
            }
        }
    }
}

#[async_trait]
impl<N, L, D> FinalityApi for FinalityService<N, L, D>
where
    N: NotaryClient,
    L: LedgerGateway,
    D: ParticipantDelivery,
{
    async fn finalize(
        &self,
        mut transaction: SignedTransaction,
        flow_id: FlowId,
    ) -> FinalityResult<CommittedTransaction> {
        Self::check_fully_signed(&transaction)?;

        debug!(flow_id = %flow_id, tx_id = %transaction.id(), "Requesting notary signature");
        let notary_signature = tokio::time::timeout(
            self.config.notary_timeout,
            self.notary.request_signature(&transaction),
        )
        .await
        .map_err(|_| FinalityError::Timeout)??;

        transaction.add_signature(notary_signature);
        let committed = CommittedTransaction { transaction };

        self.ledger.commit(&committed, flow_id).await?;
        info!(flow_id = %flow_id, tx_id = %committed.id(), "Transaction finalized");

        self.distribute(&committed).await;
        Ok(committed)
    }
}
