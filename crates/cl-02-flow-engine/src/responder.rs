//! Responder service.
//!
//! The purely reactive half of the signature-collection protocol. It waits
//! for inbound sessions, re-runs the contract validation on every proposal
//! (the initiator's verdict is never trusted), and either signs or replies
//! with a rejection. It never initiates and never retries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use cl_01_transaction::MessageContract;
use shared_types::{PartyId, PublicKey, SessionMessage, SignedTransaction};

use crate::ports::outbound::{IncomingSession, SessionAcceptor, TransactionSigner};

/// Responder for incoming send-message proposals.
pub struct ResponderService<A, S>
where
    A: SessionAcceptor + 'static,
    S: TransactionSigner + 'static,
{
    identity: PartyId,
    acceptor: Arc<A>,
    signer: Arc<S>,
}

impl<A, S> ResponderService<A, S>
where
    A: SessionAcceptor + 'static,
    S: TransactionSigner + 'static,
{
    /// Create a responder for `identity`.
    pub fn new(identity: PartyId, acceptor: Arc<A>, signer: Arc<S>) -> Self {
        Self {
            identity,
            acceptor,
            signer,
        }
    }

    /// Run the accept loop until the transport shuts down.
    ///
    /// Each accepted session is handled on its own task; one session
    /// carries exactly one proposal.
    pub async fn run(self) {
        info!(identity = %self.identity, "Responder accepting sessions");
        let signer = self.signer;
        let own_key = signer.public_key();
        while let Some(incoming) = self.acceptor.accept().await {
            let signer = Arc::clone(&signer);
            tokio::spawn(async move {
                handle_session(incoming, own_key, signer).await;
            });
        }
        info!("Responder transport closed, stopping");
    }
}

async fn handle_session<S: TransactionSigner>(
    incoming: IncomingSession,
    own_key: PublicKey,
    signer: Arc<S>,
) {
    let IncomingSession {
        initiator,
        mut session,
    } = incoming;

    let message = match session.recv().await {
        Ok(message) => message,
        Err(error) => {
            debug!(initiator = %initiator, error = %error, "Session ended before proposal");
            return;
        }
    };

    let reply = match message {
        SessionMessage::SignatureRequest { transaction } => {
            match check_proposal(&transaction, &initiator, &own_key) {
                Ok(()) => {
                    let signature = signer.sign(&transaction.id());
                    debug!(
                        initiator = %initiator,
                        tx_id = %transaction.id(),
                        "Proposal accepted, signing"
                    );
                    SessionMessage::SignatureResponse { signature }
                }
                Err(reason) => {
                    info!(initiator = %initiator, reason = %reason, "Proposal rejected");
                    SessionMessage::Rejection { reason }
                }
            }
        }
        other => {
            warn!(initiator = %initiator, "Unexpected first message on session");
            SessionMessage::Rejection {
                reason: format!("expected a signature request, got {other:?}"),
            }
        }
    };

    if let Err(error) = session.send(reply).await {
        debug!(initiator = %initiator, error = %error, "Failed to deliver reply");
    }
    session.close().await;
}

/// Validate a proposal exactly as the initiator should have.
///
/// The checks run in trust order: structure first, then that this node is
/// actually asked to sign, then that the initiator has already committed
/// itself with a valid signature.
fn check_proposal(
    transaction: &SignedTransaction,
    initiator: &PartyId,
    own_key: &PublicKey,
) -> Result<(), String> {
    MessageContract::validate(&transaction.content).map_err(|violation| violation.to_string())?;

    if !transaction.content.required_signers().contains(own_key) {
        return Err("this node is not a required signer of the proposal".into());
    }

    if transaction
        .verify_signature_of(&initiator.owning_key)
        .is_err()
    {
        return Err("proposal does not carry a valid initiator signature".into());
    }

    // Any other attached signature must verify as well.
    transaction
        .verify_signatures()
        .map_err(|error| error.to_string())?;

    Ok(())
}
