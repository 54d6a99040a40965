//! Party name resolution.

use parking_lot::RwLock;
use std::collections::HashMap;

use cl_02_flow_engine::{FlowError, PartyDirectory};
use shared_types::PartyId;

/// Directory of the well-known parties on this network.
#[derive(Default)]
pub struct InMemoryDirectory {
    parties: RwLock<HashMap<String, PartyId>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party under its legal name.
    pub fn register(&self, party: PartyId) {
        self.parties.write().insert(party.name.clone(), party);
    }
}

impl PartyDirectory for InMemoryDirectory {
    fn resolve_by_name(&self, name: &str) -> Result<PartyId, FlowError> {
        self.parties
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FlowError::UnknownParty {
                name: name.to_owned(),
            })
    }
}
