//! Subscriber-side update filtering.

use shared_types::{LedgerUpdate, RecordType};

/// Selects which updates a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFilter {
    /// Record types to pass through. Empty means all.
    pub record_types: Vec<RecordType>,
}

impl UpdateFilter {
    /// Pass every update.
    #[must_use]
    pub fn all() -> Self {
        Self {
            record_types: Vec::new(),
        }
    }

    /// Pass only updates carrying the given record types.
    #[must_use]
    pub fn record_types(record_types: Vec<RecordType>) -> Self {
        Self { record_types }
    }

    /// Whether an update passes this filter.
    #[must_use]
    pub fn matches(&self, update: &LedgerUpdate) -> bool {
        self.record_types.is_empty() || self.record_types.contains(&update.record_type)
    }
}

impl Default for UpdateFilter {
    fn default() -> Self {
        Self::all()
    }
}
