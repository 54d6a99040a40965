//! In-memory checkpoint store.
//!
//! Holds opaque encoded blobs keyed by flow id, exactly as a persistent
//! backend would. Concurrent writes from different instances are fine;
//! only the owning instance ever writes a given key.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use cl_02_flow_engine::{CheckpointStore, FlowError};
use shared_types::FlowId;

/// Checkpoint store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    blobs: Mutex<HashMap<FlowId, Vec<u8>>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Whether the store holds no checkpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, flow_id: FlowId, blob: Vec<u8>) -> Result<(), FlowError> {
        self.blobs.lock().insert(flow_id, blob);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(FlowId, Vec<u8>)>, FlowError> {
        Ok(self
            .blobs
            .lock()
            .iter()
            .map(|(flow_id, blob)| (*flow_id, blob.clone()))
            .collect())
    }

    async fn remove(&self, flow_id: FlowId) -> Result<(), FlowError> {
        self.blobs.lock().remove(&flow_id);
        Ok(())
    }
}
