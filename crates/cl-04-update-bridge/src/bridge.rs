//! The bridge between the ledger's feed and subscriber cursors.
//!
//! The ledger is the sole producer of updates; the bridge's pump task is
//! the sole writer into the broadcast bus. Subscribers hold read-only
//! cursors and can neither stall the pump nor each other.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use shared_types::LedgerUpdate;

use crate::bus::{UpdateBus, UpdatePublisher};
use crate::filter::UpdateFilter;
use crate::subscription::{UpdateStream, UpdateSubscription};

/// Republishes the ledger's ordered update feed to live subscribers.
pub struct LedgerUpdateBridge {
    bus: Arc<UpdateBus>,
    pump: JoinHandle<()>,
}

impl LedgerUpdateBridge {
    /// Start a bridge draining `upstream`.
    ///
    /// The pump preserves the feed's order exactly; there is no buffering
    /// beyond each subscriber's own cursor.
    #[must_use]
    pub fn start(upstream: mpsc::UnboundedReceiver<LedgerUpdate>, capacity: usize) -> Self {
        let bus = Arc::new(UpdateBus::with_capacity(capacity));
        let pump_bus = Arc::clone(&bus);
        let pump = tokio::spawn(async move {
            let mut upstream = upstream;
            while let Some(update) = upstream.recv().await {
                debug!(flow_id = %update.flow_id, "Bridging ledger update");
                pump_bus.publish(update).await;
            }
            info!("Ledger feed closed, bridge pump stopping");
        });
        Self { bus, pump }
    }

    /// Open a pull-style cursor.
    #[must_use]
    pub fn subscribe(&self, filter: UpdateFilter) -> UpdateSubscription {
        self.bus.subscribe(filter)
    }

    /// Open a `Stream`-style cursor.
    #[must_use]
    pub fn update_stream(&self, filter: UpdateFilter) -> UpdateStream {
        self.bus.update_stream(filter)
    }

    /// Number of live cursors.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

impl Drop for LedgerUpdateBridge {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
