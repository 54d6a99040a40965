//! Subscriber cursors.
//!
//! The policy difference from an ordinary broadcast receiver: a lagged
//! cursor is not silently skipped forward. The subscriber is told exactly
//! how many updates it lost and its sequence ends; resubscribing (plus an
//! optional fresh snapshot) is the only way back in.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

use shared_types::LedgerUpdate;

use crate::filter::UpdateFilter;

/// Why a subscription ended.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The cursor fell behind by more than the bus capacity.
    #[error("Subscriber overrun: {missed} updates lost")]
    Overrun {
        /// How many updates this subscriber will never see.
        missed: u64,
    },

    /// The subscription was cancelled or the bridge shut down.
    #[error("Subscription closed")]
    Closed,
}

/// A pull-style cursor over the update sequence.
///
/// Dropping (or cancelling) releases the cursor immediately.
pub struct UpdateSubscription {
    receiver: broadcast::Receiver<LedgerUpdate>,
    filter: UpdateFilter,
    closed: bool,
    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    filter_key: String,
}

impl UpdateSubscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<LedgerUpdate>,
        filter: UpdateFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        filter_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            closed: false,
            subscriptions,
            filter_key,
        }
    }

    /// Await the next matching update.
    ///
    /// After an `Overrun` or `Closed` error the subscription is dead and
    /// every further call returns `Closed`.
    pub async fn recv(&mut self) -> Result<LedgerUpdate, SubscriptionError> {
        if self.closed {
            return Err(SubscriptionError::Closed);
        }
        loop {
            match self.receiver.recv().await {
                Ok(update) if self.filter.matches(&update) => return Ok(update),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    self.closed = true;
                    return Err(SubscriptionError::Closed);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber overrun, closing its sequence");
                    self.closed = true;
                    return Err(SubscriptionError::Overrun { missed });
                }
            }
        }
    }

    /// Next matching update if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<LedgerUpdate>, SubscriptionError> {
        if self.closed {
            return Err(SubscriptionError::Closed);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(update) if self.filter.matches(&update) => return Ok(Some(update)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.closed = true;
                    return Err(SubscriptionError::Closed);
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber overrun, closing its sequence");
                    self.closed = true;
                    return Err(SubscriptionError::Overrun { missed });
                }
            }
        }
    }

    /// Cancel the subscription. Idempotent; further `recv` calls return
    /// `Closed`.
    pub fn cancel(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(filter = %self.filter_key, "Subscription cancelled");
        }
    }

    /// The filter this cursor was opened with.
    #[must_use]
    pub fn filter(&self) -> &UpdateFilter {
        &self.filter
    }
}

impl Drop for UpdateSubscription {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.filter_key) else {
            return;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Subscription dropped");
    }
}

/// The update sequence as a `Stream`.
///
/// Yields `Ok(update)` items in commit order; ends after yielding a single
/// `Err(Overrun)` if the cursor fell behind, or silently when the bridge
/// shuts down.
pub struct UpdateStream {
    inner: BroadcastStream<LedgerUpdate>,
    filter: UpdateFilter,
    done: bool,
}

impl UpdateStream {
    pub(crate) fn new(receiver: broadcast::Receiver<LedgerUpdate>, filter: UpdateFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            done: false,
        }
    }
}

impl Stream for UpdateStream {
    type Item = Result<LedgerUpdate, SubscriptionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Ok(update))) => {
                    if self.filter.matches(&update) {
                        return Poll::Ready(Some(Ok(update)));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(missed)))) => {
                    warn!(missed, "Subscriber overrun, closing its stream");
                    self.done = true;
                    return Poll::Ready(Some(Err(SubscriptionError::Overrun { missed })));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{UpdateBus, UpdatePublisher};
    use shared_types::{FlowId, RecordType, UpdateType};
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn update() -> LedgerUpdate {
        LedgerUpdate {
            consumed: BTreeSet::new(),
            produced: BTreeSet::new(),
            flow_id: FlowId::fresh(),
            update_type: UpdateType::General,
            record_type: RecordType::Message,
        }
    }

    #[tokio::test]
    async fn test_recv_in_publish_order() {
        let bus = UpdateBus::new();
        let mut sub = bus.subscribe(UpdateFilter::all());

        let first = update();
        let second = update();
        bus.publish(first.clone()).await;
        bus.publish(second.clone()).await;

        let got_first = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("update");
        let got_second = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("update");

        assert_eq!(got_first.flow_id, first.flow_id);
        assert_eq!(got_second.flow_id, second.flow_id);
    }

    #[tokio::test]
    async fn test_overrun_closes_sequence() {
        let bus = UpdateBus::with_capacity(2);
        let mut sub = bus.subscribe(UpdateFilter::all());

        for _ in 0..8 {
            bus.publish(update()).await;
        }

        let mut saw_overrun = false;
        loop {
            match sub.recv().await {
                Ok(_) => continue,
                Err(SubscriptionError::Overrun { missed }) => {
                    assert!(missed > 0);
                    saw_overrun = true;
                    break;
                }
                Err(SubscriptionError::Closed) => break,
            }
        }
        assert!(saw_overrun);

        // Dead after overrun.
        assert_eq!(sub.recv().await, Err(SubscriptionError::Closed));
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_affect_others() {
        let bus = UpdateBus::with_capacity(2);
        let mut slow = bus.subscribe(UpdateFilter::all());
        let mut fast = bus.subscribe(UpdateFilter::all());

        let mut fast_seen = 0;
        for _ in 0..10 {
            bus.publish(update()).await;
            // The fast subscriber drains as it goes.
            while let Ok(Some(_)) = fast.try_recv() {
                fast_seen += 1;
            }
        }

        assert_eq!(fast_seen, 10);
        assert!(matches!(
            slow.recv().await,
            Err(SubscriptionError::Overrun { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let bus = UpdateBus::new();
        let mut sub = bus.subscribe(UpdateFilter::all());

        sub.cancel();
        sub.cancel();
        assert_eq!(sub.recv().await, Err(SubscriptionError::Closed));
    }

    #[tokio::test]
    async fn test_no_replay_before_subscribe() {
        let bus = UpdateBus::new();
        bus.publish(update()).await;

        let mut sub = bus.subscribe(UpdateFilter::all());
        assert_eq!(sub.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_stream_yields_updates_then_ends_on_overrun() {
        let bus = UpdateBus::with_capacity(2);
        let mut stream = bus.update_stream(UpdateFilter::all());

        for _ in 0..8 {
            bus.publish(update()).await;
        }

        let mut saw_overrun = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(_) => continue,
                Err(SubscriptionError::Overrun { .. }) => {
                    saw_overrun = true;
                }
                Err(SubscriptionError::Closed) => unreachable!("streams end, not close"),
            }
        }
        assert!(saw_overrun);
    }
}
