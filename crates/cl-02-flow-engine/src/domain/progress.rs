//! Progress tracking for initiator flows.
//!
//! Observers of a tracked flow see a fixed sequence of human-readable step
//! labels, then the terminal result. The labels are part of the external
//! surface and never change between releases.

use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use shared_types::FlowId;

/// The steps an initiator flow reports, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    Creating,
    Verifying,
    Signing,
    SendingToCounterparty,
    Finalising,
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Creating => "Creating",
            Self::Verifying => "Verifying",
            Self::Signing => "Signing",
            Self::SendingToCounterparty => "Sending to Counterparty",
            Self::Finalising => "Finalising",
        };
        write!(f, "{label}")
    }
}

/// Publishes progress steps to whoever holds the receiving half.
///
/// Sending never blocks the flow; a dropped receiver simply discards
/// further steps.
pub struct ProgressTracker {
    flow_id: FlowId,
    sender: mpsc::UnboundedSender<ProgressStep>,
}

impl ProgressTracker {
    /// Create a tracker and the receiver its steps arrive on.
    #[must_use]
    pub fn new(flow_id: FlowId) -> (Self, mpsc::UnboundedReceiver<ProgressStep>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { flow_id, sender }, receiver)
    }

    /// Record entry into a step.
    pub fn set_current_step(&self, step: ProgressStep) {
        debug!(flow_id = %self.flow_id, step = %step, "Flow progress");
        let _ = self.sender.send(step);
    }
}
