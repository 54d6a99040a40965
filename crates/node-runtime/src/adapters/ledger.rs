//! In-memory ledger and participant vaults.
//!
//! The canonical ledger is the single source of committed truth: commit is
//! idempotent per transaction id and emits exactly one update on the feed
//! per first-time commit, in commit order. Each participant additionally
//! keeps a vault, its own local view, updated through at-least-once
//! delivery and deduplicated by transaction id.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use cl_03_notary::{FinalityResult, LedgerGateway};
use shared_types::{
    CommittedTransaction, FlowId, LedgerUpdate, LinearId, MessageRecord, RecordType,
    TransactionId, UpdateType,
};

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<TransactionId, CommittedTransaction>,
    records: HashMap<LinearId, MessageRecord>,
    /// Linear ids in commit order, for deterministic snapshots.
    record_order: Vec<LinearId>,
}

/// The canonical committed ledger.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    feed: mpsc::UnboundedSender<LedgerUpdate>,
}

impl InMemoryLedger {
    /// Create a ledger and the ordered feed the update bridge drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LedgerUpdate>) {
        let (feed, feed_rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Mutex::new(LedgerState::default()),
                feed,
            },
            feed_rx,
        )
    }

    /// Look up a committed transaction.
    #[must_use]
    pub fn transaction(&self, id: &TransactionId) -> Option<CommittedTransaction> {
        self.state.lock().transactions.get(id).cloned()
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn commit(
        &self,
        transaction: &CommittedTransaction,
        flow_id: FlowId,
    ) -> FinalityResult<()> {
        let tx_id = transaction.id();
        let update = {
            let mut state = self.state.lock();
            if state.transactions.contains_key(&tx_id) {
                debug!(tx_id = %tx_id, "Duplicate commit ignored");
                return Ok(());
            }
            for output in &transaction.transaction.content.outputs {
                let linear_id = output.record.linear_id;
                state.records.insert(linear_id, output.record.clone());
                state.record_order.push(linear_id);
            }
            state.transactions.insert(tx_id, transaction.clone());

            LedgerUpdate {
                consumed: transaction.transaction.content.inputs.iter().copied().collect(),
                produced: transaction.produced_refs(),
                flow_id,
                update_type: UpdateType::General,
                record_type: RecordType::Message,
            }
        };

        info!(tx_id = %tx_id, flow_id = %flow_id, "Transaction committed");
        // A closed feed only means no bridge is attached; the commit stands.
        let _ = self.feed.send(update);
        Ok(())
    }

    async fn unconsumed_records(&self, record_type: RecordType) -> Vec<MessageRecord> {
        if record_type != RecordType::Message {
            return Vec::new();
        }
        let state = self.state.lock();
        state
            .record_order
            .iter()
            .filter_map(|linear_id| state.records.get(linear_id).cloned())
            .collect()
    }
}

/// One participant's local view of the ledger.
pub struct NodeVault {
    owner: String,
    seen: Mutex<HashSet<TransactionId>>,
    records: Mutex<Vec<MessageRecord>>,
}

impl NodeVault {
    /// Create an empty vault for `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            seen: Mutex::new(HashSet::new()),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Apply a committed transaction to the local view.
    ///
    /// Idempotent by transaction id: repeated delivery of the same
    /// transaction changes nothing and returns `false`.
    pub fn apply(&self, transaction: &CommittedTransaction) -> bool {
        let tx_id = transaction.id();
        if !self.seen.lock().insert(tx_id) {
            debug!(owner = %self.owner, tx_id = %tx_id, "Duplicate delivery ignored");
            return false;
        }
        let mut records = self.records.lock();
        for output in &transaction.transaction.content.outputs {
            records.push(output.record.clone());
        }
        debug!(owner = %self.owner, tx_id = %tx_id, "Local view updated");
        true
    }

    /// The records this participant has seen, in delivery order.
    #[must_use]
    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.lock().clone()
    }

    /// Number of distinct transactions applied.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.seen.lock().len()
    }
}
