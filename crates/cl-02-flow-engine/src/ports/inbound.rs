//! Driving Ports (API - Inbound).

use async_trait::async_trait;
use shared_types::{FlowId, MessageRecord};

use crate::error::FlowError;
use crate::service::FlowHandle;

/// The operations the flow engine exposes to callers (e.g. the node
/// facade sitting under an RPC or HTTP layer).
#[async_trait]
pub trait FlowInitiator: Send + Sync {
    /// Start a tracked send-message flow for `record`.
    ///
    /// Returns immediately; the instance runs as its own task and reports
    /// through the handle.
    async fn start_tracked(&self, record: MessageRecord) -> FlowHandle;

    /// Request cooperative cancellation of a running instance.
    ///
    /// Succeeds only while the instance has not entered `FINALIZING`;
    /// a cancelled instance leaves no trace on the ledger.
    async fn cancel(&self, flow_id: FlowId) -> Result<(), FlowError>;

    /// Re-enter every instance with a persisted checkpoint.
    ///
    /// Called once at startup, before new flows are accepted.
    async fn resume_pending(&self) -> Result<Vec<FlowHandle>, FlowError>;
}
