use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::matching::domain::reference_set::ReferenceSet;

/// Process-scoped pipeline state: the enabled flag and the current
/// reference set.
///
/// Owned by the command router and passed by handle into the scheduler
/// and observer rather than accessed as ambient globals. The scheduler
/// snapshots the reference `Arc` once per batch, so a wholesale
/// replacement never mutates a set mid-comparison.
pub struct PipelineState {
    enabled: AtomicBool,
    references: RwLock<Arc<ReferenceSet>>,
}

impl PipelineState {
    pub fn new(enabled: bool, references: ReferenceSet) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            references: RwLock::new(Arc::new(references)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn references(&self) -> Arc<ReferenceSet> {
        self.references
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn replace_references(&self, references: ReferenceSet) {
        if let Ok(mut slot) = self.references.write() {
            *slot = Arc::new(references);
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(false, ReferenceSet::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::fingerprint::Fingerprint;
    use crate::shared::bounding_box::BoundingBox;

    #[test]
    fn test_enable_flag_round_trip() {
        let state = PipelineState::default();
        assert!(!state.is_enabled());
        state.set_enabled(true);
        assert!(state.is_enabled());
    }

    #[test]
    fn test_replace_references_swaps_wholesale() {
        let state = PipelineState::default();
        let before = state.references();
        assert!(before.is_empty());

        let set = ReferenceSet::new(vec![Fingerprint::Embedding {
            vector: vec![0.1],
            bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        }])
        .unwrap();
        state.replace_references(set);

        // The old snapshot is untouched; the new read sees the swap.
        assert!(before.is_empty());
        assert_eq!(state.references().len(), 1);
    }
}
