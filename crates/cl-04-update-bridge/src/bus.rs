//! The broadcast primitive.
//!
//! One writer, many independent reader cursors. Each cursor owns a bounded
//! buffer; a cursor that falls more than the capacity behind is overrun
//! and its sequence ends. The writer and the other cursors are never
//! blocked by a slow reader.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use shared_types::LedgerUpdate;

use crate::filter::UpdateFilter;
use crate::subscription::{UpdateStream, UpdateSubscription};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Trait for publishing updates into the fan-out.
///
/// Exactly one writer exists per bridge: the pump draining the ledger feed.
#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    /// Publish an update to all live cursors.
    ///
    /// Returns the number of cursors that received it.
    async fn publish(&self, update: LedgerUpdate) -> usize;

    /// Total updates published so far.
    fn updates_published(&self) -> u64;
}

/// In-memory fan-out over `tokio::sync::broadcast`.
pub struct UpdateBus {
    /// Broadcast sender for updates.
    sender: broadcast::Sender<LedgerUpdate>,

    /// Active subscription count by filter key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total updates published.
    updates_published: AtomicU64,

    /// Per-cursor buffer capacity.
    capacity: usize,
}

impl UpdateBus {
    /// Create a bus with the default per-cursor capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a specific per-cursor capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            updates_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Open a new cursor receiving every update published from now on.
    #[must_use]
    pub fn subscribe(&self, filter: UpdateFilter) -> UpdateSubscription {
        let receiver = self.sender.subscribe();
        let filter_key = format!("{:?}", filter.record_types);

        {
            if let Ok(mut subs) = self.subscriptions.write() {
                *subs.entry(filter_key.clone()).or_insert(0) += 1;
            }
        }

        debug!(filter = ?filter.record_types, "New update subscription");

        UpdateSubscription::new(receiver, filter, self.subscriptions.clone(), filter_key)
    }

    /// Open a cursor as a `Stream` of updates.
    #[must_use]
    pub fn update_stream(&self, filter: UpdateFilter) -> UpdateStream {
        let receiver = self.sender.subscribe();
        UpdateStream::new(receiver, filter)
    }

    /// Number of live cursors.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-cursor buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdatePublisher for UpdateBus {
    async fn publish(&self, update: LedgerUpdate) -> usize {
        self.updates_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(update) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Update published");
                receiver_count
            }
            Err(e) => {
                // No live cursors; the update is only visible via snapshot.
                warn!(error = %e, "Update published with no subscribers");
                0
            }
        }
    }

    fn updates_published(&self) -> u64 {
        self.updates_published.load(Ordering::Relaxed)
    }
}
