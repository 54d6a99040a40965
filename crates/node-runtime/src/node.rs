//! The per-party node facade.
//!
//! This is the surface an HTTP or RPC layer would sit on: `post` maps a
//! request to a tracked flow and yields progress strings ending in a
//! transaction id or an error, `updates` is the live ledger stream, and
//! `snapshot` is the separate one-shot historical query.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use cl_02_flow_engine::{FlowEngine, FlowError, FlowHandle, PartyDirectory};
use cl_03_notary::LedgerGateway;
use cl_04_update_bridge::{LedgerUpdateBridge, UpdateFilter, UpdateStream};
use shared_types::{FlowId, MessageRecord, PartyId, RecordType};

use crate::adapters::{
    FinalityAdapter, InMemoryCheckpointStore, InMemoryDirectory, InMemoryLedger, NodeKeystore,
    NodeTransport, NodeVault,
};

type NodeEngine =
    FlowEngine<NodeTransport, NodeKeystore, InMemoryCheckpointStore, FinalityAdapter>;

/// A message post request, as received from the outer layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessage {
    /// Legal name of the recipient party.
    pub recipient: String,
    /// Message body.
    pub contents: String,
}

/// One party's node: flow engine, responder, vault, and the shared
/// network services it is wired to.
pub struct Node {
    identity: PartyId,
    engine: NodeEngine,
    directory: Arc<InMemoryDirectory>,
    bridge: Arc<LedgerUpdateBridge>,
    ledger: Arc<InMemoryLedger>,
    vault: Arc<NodeVault>,
    responder_task: JoinHandle<()>,
}

impl Node {
    pub(crate) fn new(
        identity: PartyId,
        engine: NodeEngine,
        directory: Arc<InMemoryDirectory>,
        bridge: Arc<LedgerUpdateBridge>,
        ledger: Arc<InMemoryLedger>,
        vault: Arc<NodeVault>,
        responder_task: JoinHandle<()>,
    ) -> Self {
        Self {
            identity,
            engine,
            directory,
            bridge,
            ledger,
            vault,
            responder_task,
        }
    }

    /// This node's identity.
    #[must_use]
    pub fn identity(&self) -> PartyId {
        self.identity.clone()
    }

    /// Post a message to a named counterparty.
    ///
    /// The returned stream yields the progress labels in protocol order
    /// and terminates with the committed transaction id, or with a single
    /// `Error: …` line.
    #[must_use]
    pub fn post(&self, message: PostMessage) -> UnboundedReceiverStream<String> {
        let (tx, rx) = mpsc::unbounded_channel();

        match self.directory.resolve_by_name(&message.recipient) {
            Err(error) => {
                let _ = tx.send(format!("Error: {error}"));
            }
            Ok(recipient) => {
                let record =
                    MessageRecord::new(self.identity.clone(), recipient, message.contents);
                debug!(linear_id = %record.linear_id, "Posting message record");
                let handle = self.engine.start_tracked(record);
                tokio::spawn(forward_flow(handle, tx));
            }
        }

        UnboundedReceiverStream::new(rx)
    }

    /// Start a tracked flow for an already-built record.
    ///
    /// The typed counterpart of [`post`](Self::post), for callers that
    /// want the structured handle.
    #[must_use]
    pub fn post_record(&self, record: MessageRecord) -> FlowHandle {
        self.engine.start_tracked(record)
    }

    /// Subscribe to the live ledger update stream for message records.
    ///
    /// Infinite, cancellable, not restartable; only updates committed
    /// after this call are seen.
    #[must_use]
    pub fn updates(&self) -> UpdateStream {
        self.bridge
            .update_stream(UpdateFilter::record_types(vec![RecordType::Message]))
    }

    /// One-shot snapshot of the committed message records.
    pub async fn snapshot(&self) -> Vec<MessageRecord> {
        self.ledger.unconsumed_records(RecordType::Message).await
    }

    /// Request cancellation of a running flow.
    pub fn cancel(&self, flow_id: FlowId) -> Result<(), FlowError> {
        self.engine.request_cancel(flow_id)
    }

    /// Resume every checkpointed flow instance.
    pub async fn resume_pending(&self) -> Result<Vec<FlowHandle>, FlowError> {
        self.engine.resume_pending().await
    }

    /// This node's local record view.
    #[must_use]
    pub fn vault(&self) -> Arc<NodeVault> {
        Arc::clone(&self.vault)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.responder_task.abort();
    }
}

/// Pump one flow's progress and terminal result into a string stream.
async fn forward_flow(mut handle: FlowHandle, tx: mpsc::UnboundedSender<String>) {
    while let Some(step) = handle.progress.recv().await {
        if tx.send(step.to_string()).is_err() {
            // Caller went away; let the flow itself run to completion.
            break;
        }
    }
    let terminal = match handle.result.await {
        Ok(Ok(committed)) => committed.id().to_string(),
        Ok(Err(error)) => format!("Error: {error}"),
        Err(_) => "Error: flow terminated unexpectedly".to_owned(),
    };
    let _ = tx.send(terminal);
}
