//! Flow Engine - Core orchestration logic.
//!
//! Each initiator instance runs as an independent task driving the explicit
//! state machine. The engine owns the instance registry (stage plus
//! cancellation state per flow) and the checkpoint discipline: a checkpoint
//! is written immediately before each suspension point and removed at
//! termination, so a restart re-enters exactly where the instance suspended.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, warn};

use cl_01_transaction::{MessageContract, TransactionBuilder};
use shared_types::{
    verify_signature, CommittedTransaction, FlowId, MessageRecord, PartyId, SessionMessage,
    SignedTransaction,
};

use crate::domain::checkpoint::{CheckpointStage, FlowCheckpoint};
use crate::domain::progress::{ProgressStep, ProgressTracker};
use crate::domain::state::FlowStage;
use crate::error::FlowError;
use crate::ports::inbound::FlowInitiator;
use crate::ports::outbound::{
    CheckpointStore, FinalityGateway, FlowSession, SessionTransport, TransactionSigner,
};

/// Flow engine configuration.
///
/// Identities and timeouts arrive here explicitly; the engine keeps no
/// ambient state.
#[derive(Clone, Debug)]
pub struct FlowEngineConfig {
    /// The identity this node initiates flows as.
    pub identity: PartyId,
    /// The notary every transaction is finalized by.
    pub notary: PartyId,
    /// Bound on the counterparty round trip.
    pub counterparty_timeout: Duration,
}

/// Handle to one running flow instance.
///
/// Progress steps arrive in protocol order; the result resolves exactly
/// once with the committed transaction or the failure.
pub struct FlowHandle {
    /// The instance's correlation id.
    pub flow_id: FlowId,
    /// Live progress step feed.
    pub progress: mpsc::UnboundedReceiver<ProgressStep>,
    /// Terminal outcome.
    pub result: oneshot::Receiver<Result<CommittedTransaction, FlowError>>,
}

/// Registry entry for one instance.
struct Instance {
    state: Arc<RwLock<InstanceState>>,
    cancel_notify: Arc<Notify>,
}

struct InstanceState {
    stage: FlowStage,
    cancel_requested: bool,
}

/// Where an instance enters the state machine.
enum Entry {
    Fresh(MessageRecord),
    Resume(FlowCheckpoint),
}

/// Flow Engine implementation.
pub struct FlowEngine<T, S, C, F>
where
    T: SessionTransport + 'static,
    S: TransactionSigner + 'static,
    C: CheckpointStore + 'static,
    F: FinalityGateway + 'static,
{
    config: FlowEngineConfig,
    transport: Arc<T>,
    signer: Arc<S>,
    checkpoints: Arc<C>,
    finality: Arc<F>,
    instances: Arc<RwLock<HashMap<FlowId, Instance>>>,
}

impl<T, S, C, F> FlowEngine<T, S, C, F>
where
    T: SessionTransport + 'static,
    S: TransactionSigner + 'static,
    C: CheckpointStore + 'static,
    F: FinalityGateway + 'static,
{
    /// Create a new flow engine.
    pub fn new(
        config: FlowEngineConfig,
        transport: Arc<T>,
        signer: Arc<S>,
        checkpoints: Arc<C>,
        finality: Arc<F>,
    ) -> Self {
        Self {
            config,
            transport,
            signer,
            checkpoints,
            finality,
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a tracked send-message flow for `record`.
    pub fn start_tracked(&self, record: MessageRecord) -> FlowHandle {
        let flow_id = FlowId::fresh();
        info!(
            flow_id = %flow_id,
            recipient = %record.recipient,
            "Starting send-message flow"
        );
        self.spawn_instance(flow_id, Entry::Fresh(record))
    }

    /// Request cooperative cancellation of a running instance.
    ///
    /// Allowed only while the instance has not entered `FINALIZING`; once
    /// notarization has begun the outcome is irrevocable either way.
    pub fn request_cancel(&self, flow_id: FlowId) -> Result<(), FlowError> {
        let instances = self.instances.read();
        let instance = instances
            .get(&flow_id)
            .ok_or_else(|| FlowError::UnknownFlow {
                flow_id: flow_id.to_string(),
            })?;

        let mut state = instance.state.write();
        if state.stage.past_point_of_no_return() {
            return Err(FlowError::CancellationDenied {
                stage: state.stage.to_string(),
            });
        }
        state.cancel_requested = true;
        // A buffered permit, so the instance sees the request even if it
        // has not reached its suspension point yet.
        instance.cancel_notify.notify_one();
        info!(flow_id = %flow_id, "Cancellation requested");
        Ok(())
    }

    /// Re-enter every instance with a persisted checkpoint.
    ///
    /// Undecodable checkpoints are skipped with a warning; they cannot be
    /// resumed and a fresh flow is the only retry path anyway.
    pub async fn resume_pending(&self) -> Result<Vec<FlowHandle>, FlowError> {
        let stored = self.checkpoints.load_all().await?;
        let mut handles = Vec::with_capacity(stored.len());
        for (flow_id, blob) in stored {
            match FlowCheckpoint::from_bytes(&blob) {
                Ok(checkpoint) => {
                    handles.push(self.spawn_instance(flow_id, Entry::Resume(checkpoint)));
                }
                Err(error) => {
                    warn!(flow_id = %flow_id, error = %error, "Skipping undecodable checkpoint");
                }
            }
        }
        Ok(handles)
    }

    /// The stage an instance is currently in, if it is registered.
    #[must_use]
    pub fn stage_of(&self, flow_id: FlowId) -> Option<FlowStage> {
        self.instances
            .read()
            .get(&flow_id)
            .map(|i| i.state.read().stage)
    }

    fn register(&self, flow_id: FlowId) {
        let instance = Instance {
            state: Arc::new(RwLock::new(InstanceState {
                stage: FlowStage::Creating,
                cancel_requested: false,
            })),
            cancel_notify: Arc::new(Notify::new()),
        };
        self.instances.write().insert(flow_id, instance);
    }

    fn set_stage(&self, flow_id: FlowId, stage: FlowStage) {
        if let Some(instance) = self.instances.read().get(&flow_id) {
            instance.state.write().stage = stage;
        }
        debug!(flow_id = %flow_id, stage = %stage, "Flow stage");
    }

    fn cancel_requested(&self, flow_id: FlowId) -> bool {
        self.instances
            .read()
            .get(&flow_id)
            .map(|i| i.state.read().cancel_requested)
            .unwrap_or(false)
    }

    fn cancel_notify(&self, flow_id: FlowId) -> Option<Arc<Notify>> {
        self.instances
            .read()
            .get(&flow_id)
            .map(|i| i.cancel_notify.clone())
    }

    /// Enter `FINALIZING` unless cancellation won the race.
    ///
    /// Stage transition and cancellation check happen under one lock, so
    /// `request_cancel` can never succeed against an instance that is
    /// already consulting the notary.
    fn enter_finalizing(&self, flow_id: FlowId) -> Result<(), FlowError> {
        let instances = self.instances.read();
        let Some(instance) = instances.get(&flow_id) else {
            return Ok(());
        };
        let mut state = instance.state.write();
        if state.cancel_requested {
            return Err(FlowError::Cancelled);
        }
        state.stage = FlowStage::Finalizing;
        Ok(())
    }

    fn spawn_instance(&self, flow_id: FlowId, entry: Entry) -> FlowHandle {
        let (tracker, progress) = ProgressTracker::new(flow_id);
        let (result_tx, result_rx) = oneshot::channel();
        self.register(flow_id);

        let engine = self.clone();
        tokio::spawn(async move {
            let outcome = engine.run_initiator(flow_id, entry, &tracker).await;
            match &outcome {
                Ok(committed) => {
                    engine.set_stage(flow_id, FlowStage::Done);
                    info!(flow_id = %flow_id, tx_id = %committed.id(), "Flow complete");
                }
                Err(error) => {
                    engine.set_stage(flow_id, FlowStage::Failed);
                    info!(flow_id = %flow_id, error = %error, "Flow failed");
                }
            }
            // Terminal instances never leave a checkpoint behind.
            if let Err(error) = engine.checkpoints.remove(flow_id).await {
                warn!(flow_id = %flow_id, error = %error, "Checkpoint cleanup failed");
            }
            let _ = result_tx.send(outcome);
        });

        FlowHandle {
            flow_id,
            progress,
            result: result_rx,
        }
    }

    async fn run_initiator(
        &self,
        flow_id: FlowId,
        entry: Entry,
        tracker: &ProgressTracker,
    ) -> Result<CommittedTransaction, FlowError> {
        match entry {
            Entry::Fresh(record) => self.run_fresh(flow_id, record, tracker).await,
            Entry::Resume(checkpoint) => self.run_resumed(flow_id, checkpoint, tracker).await,
        }
    }

    async fn run_fresh(
        &self,
        flow_id: FlowId,
        record: MessageRecord,
        tracker: &ProgressTracker,
    ) -> Result<CommittedTransaction, FlowError> {
        // CREATING
        tracker.set_current_step(ProgressStep::Creating);
        let tx = TransactionBuilder::build(record.clone(), self.config.notary.clone());

        // VERIFYING
        self.set_stage(flow_id, FlowStage::Verifying);
        tracker.set_current_step(ProgressStep::Verifying);
        MessageContract::validate(&tx)?;

        // SIGNING
        self.set_stage(flow_id, FlowStage::Signing);
        tracker.set_current_step(ProgressStep::Signing);
        let mut stx = SignedTransaction::new(tx);
        let id = stx.id();
        stx.add_signature(self.signer.sign(&id));

        if self.cancel_requested(flow_id) {
            return Err(FlowError::Cancelled);
        }

        // AWAITING_COUNTERPARTY: checkpoint, then send, then suspend.
        let mut session = self.transport.open(&record.recipient).await?;
        let checkpoint = FlowCheckpoint {
            flow_id,
            record: record.clone(),
            stage: CheckpointStage::AwaitingCounterparty {
                session_id: session.id(),
                transaction: stx.clone(),
            },
        };
        self.checkpoints
            .save(flow_id, checkpoint.to_bytes()?)
            .await?;
        self.set_stage(flow_id, FlowStage::AwaitingCounterparty);
        tracker.set_current_step(ProgressStep::SendingToCounterparty);
        session
            .send(SessionMessage::SignatureRequest {
                transaction: stx.clone(),
            })
            .await?;

        self.await_counterparty(flow_id, record, stx, session, tracker)
            .await
    }

    async fn run_resumed(
        &self,
        flow_id: FlowId,
        checkpoint: FlowCheckpoint,
        tracker: &ProgressTracker,
    ) -> Result<CommittedTransaction, FlowError> {
        info!(flow_id = %flow_id, "Resuming flow from checkpoint");
        match checkpoint.stage {
            CheckpointStage::AwaitingCounterparty {
                session_id,
                transaction,
            } => {
                // The request was sent before the checkpoint was written;
                // re-attach and keep waiting, never resend.
                let session = self.transport.reattach(session_id).await?;
                self.set_stage(flow_id, FlowStage::AwaitingCounterparty);
                tracker.set_current_step(ProgressStep::SendingToCounterparty);
                self.await_counterparty(flow_id, checkpoint.record, transaction, session, tracker)
                    .await
            }
            CheckpointStage::Finalizing { transaction } => {
                self.enter_finalizing(flow_id)?;
                tracker.set_current_step(ProgressStep::Finalising);
                self.finality.finalize(transaction, flow_id).await
            }
        }
    }

    async fn await_counterparty(
        &self,
        flow_id: FlowId,
        record: MessageRecord,
        mut stx: SignedTransaction,
        mut session: Box<dyn FlowSession>,
        tracker: &ProgressTracker,
    ) -> Result<CommittedTransaction, FlowError> {
        if self.cancel_requested(flow_id) {
            session.close().await;
            return Err(FlowError::Cancelled);
        }

        let reply = match self.cancel_notify(flow_id) {
            Some(notify) => {
                tokio::select! {
                    _ = notify.notified() => {
                        session.close().await;
                        return Err(FlowError::Cancelled);
                    }
                    r = tokio::time::timeout(self.config.counterparty_timeout, session.recv()) => r,
                }
            }
            None => tokio::time::timeout(self.config.counterparty_timeout, session.recv()).await,
        };

        let message = match reply {
            Err(_elapsed) => {
                session.close().await;
                return Err(FlowError::Timeout {
                    waiting_for: "counterparty signature".into(),
                });
            }
            Ok(Err(error)) => {
                session.close().await;
                return Err(error);
            }
            Ok(Ok(message)) => message,
        };

        match message {
            SessionMessage::SignatureResponse { signature } => {
                session.close().await;

                // COUNTERPARTY_SIGNED: only the recipient's valid signature
                // over this exact transaction id is accepted.
                if signature.by != record.recipient.owning_key {
                    return Err(FlowError::InvalidSignature {
                        by: hex::encode(signature.by),
                    });
                }
                verify_signature(&signature.by, &stx.id().0, &signature.signature).map_err(
                    |_| FlowError::InvalidSignature {
                        by: hex::encode(signature.by),
                    },
                )?;
                stx.add_signature(signature);
                self.set_stage(flow_id, FlowStage::CounterpartySigned);

                // FINALIZING: checkpoint before the second suspension.
                let checkpoint = FlowCheckpoint {
                    flow_id,
                    record,
                    stage: CheckpointStage::Finalizing {
                        transaction: stx.clone(),
                    },
                };
                self.checkpoints
                    .save(flow_id, checkpoint.to_bytes()?)
                    .await?;
                self.enter_finalizing(flow_id)?;
                tracker.set_current_step(ProgressStep::Finalising);
                self.finality.finalize(stx, flow_id).await
            }
            SessionMessage::Rejection { reason } => {
                session.close().await;
                Err(FlowError::CounterpartyRejected { reason })
            }
            SessionMessage::SignatureRequest { .. } => {
                session.close().await;
                Err(FlowError::UnexpectedMessage {
                    got: "SignatureRequest".into(),
                })
            }
        }
    }
}

/// The engine hands a clone of itself to every instance task; all state
/// lives behind `Arc`s, so clones are cheap and share everything.
impl<T, S, C, F> Clone for FlowEngine<T, S, C, F>
where
    T: SessionTransport + 'static,
    S: TransactionSigner + 'static,
    C: CheckpointStore + 'static,
    F: FinalityGateway + 'static,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            signer: Arc::clone(&self.signer),
            checkpoints: Arc::clone(&self.checkpoints),
            finality: Arc::clone(&self.finality),
            instances: Arc::clone(&self.instances),
        }
    }
}

#[async_trait]
impl<T, S, C, F> FlowInitiator for FlowEngine<T, S, C, F>
where
    T: SessionTransport + 'static,
    S: TransactionSigner + 'static,
    C: CheckpointStore + 'static,
    F: FinalityGateway + 'static,
{
    async fn start_tracked(&self, record: MessageRecord) -> FlowHandle {
        FlowEngine::start_tracked(self, record)
    }

    async fn cancel(&self, flow_id: FlowId) -> Result<(), FlowError> {
        self.request_cancel(flow_id)
    }

    async fn resume_pending(&self) -> Result<Vec<FlowHandle>, FlowError> {
        FlowEngine::resume_pending(self).await
    }
}
