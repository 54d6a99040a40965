//! Flow instance stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stage a flow instance is currently in.
///
/// Stages advance strictly left to right on the happy path; `Failed` is
/// reachable from anywhere. Only `AwaitingCounterparty` and `Finalizing`
/// suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStage {
    Creating,
    Verifying,
    Signing,
    AwaitingCounterparty,
    CounterpartySigned,
    Finalizing,
    Done,
    Failed,
}

impl FlowStage {
    /// True once the instance may no longer be cancelled.
    ///
    /// From `Finalizing` onward the notary may already have signed, and a
    /// notary signature is irrevocable.
    #[must_use]
    pub fn past_point_of_no_return(self) -> bool {
        matches!(self, Self::Finalizing | Self::Done | Self::Failed)
    }

    /// True for `Done` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creating => "CREATING",
            Self::Verifying => "VERIFYING",
            Self::Signing => "SIGNING",
            Self::AwaitingCounterparty => "AWAITING_COUNTERPARTY",
            Self::CounterpartySigned => "COUNTERPARTY_SIGNED",
            Self::Finalizing => "FINALIZING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        write!(f, "{name}")
    }
}
