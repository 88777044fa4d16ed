use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::content::domain::content_tree::ContentTree;
use crate::shared::constants::SUPPRESSION_FILTER;
use crate::shared::image_id::ImageId;

#[derive(Clone, Debug)]
struct Applied {
    /// Filter value the element had before suppression, restored on removal.
    prior_filter: Option<String>,
    revealed: bool,
}

/// Applies and removes the visual suppression treatment, independent of
/// the detection pipeline's bookkeeping.
///
/// Both directions are idempotent. The reveal toggle swaps the filter
/// between obscured and the element's prior state without touching
/// lifecycle state or re-running detection; the marker stays on while
/// the element counts as suppressed.
pub struct SuppressionController {
    tree: Arc<dyn ContentTree>,
    applied: Mutex<HashMap<ImageId, Applied>>,
}

impl SuppressionController {
    pub fn new(tree: Arc<dyn ContentTree>) -> Self {
        Self {
            tree,
            applied: Mutex::new(HashMap::new()),
        }
    }

    pub fn apply(&self, id: ImageId) {
        let Ok(mut applied) = self.applied.lock() else {
            return;
        };
        if applied.contains_key(&id) {
            return;
        }
        let prior_filter = self.tree.visual_filter(id);
        self.tree.set_visual_filter(id, Some(SUPPRESSION_FILTER));
        self.tree.set_suppression_marker(id, true);
        applied.insert(
            id,
            Applied {
                prior_filter,
                revealed: false,
            },
        );
        debug!("{id}: suppression applied");
    }

    pub fn remove(&self, id: ImageId) {
        let Ok(mut applied) = self.applied.lock() else {
            return;
        };
        let Some(entry) = applied.remove(&id) else {
            return;
        };
        self.tree.set_visual_filter(id, entry.prior_filter.as_deref());
        self.tree.set_suppression_marker(id, false);
        debug!("{id}: suppression removed");
    }

    /// Flips between obscured and temporarily revealed. Host click
    /// handlers call this; it is a no-op for non-suppressed images.
    pub fn toggle(&self, id: ImageId) {
        let Ok(mut applied) = self.applied.lock() else {
            return;
        };
        let Some(entry) = applied.get_mut(&id) else {
            return;
        };
        entry.revealed = !entry.revealed;
        if entry.revealed {
            self.tree.set_visual_filter(id, entry.prior_filter.as_deref());
        } else {
            self.tree.set_visual_filter(id, Some(SUPPRESSION_FILTER));
        }
    }

    pub fn is_suppressed(&self, id: ImageId) -> bool {
        self.applied
            .lock()
            .map(|applied| applied.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn is_revealed(&self, id: ImageId) -> bool {
        self.applied
            .lock()
            .map(|applied| applied.get(&id).is_some_and(|e| e.revealed))
            .unwrap_or(false)
    }

    pub fn suppressed_ids(&self) -> Vec<ImageId> {
        self.applied
            .lock()
            .map(|applied| {
                let mut ids: Vec<ImageId> = applied.keys().copied().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }

    /// Removes suppression from every image; used on global disable and
    /// reference-set replacement. Returns the ids that were suppressed.
    pub fn remove_all(&self) -> Vec<ImageId> {
        let ids = self.suppressed_ids();
        for id in &ids {
            self.remove(*id);
        }
        ids
    }

    /// Drops records for images no longer in the tree. There is nothing
    /// to restore on a removed element.
    pub fn retain_present(&self, live: &HashSet<ImageId>) {
        if let Ok(mut applied) = self.applied.lock() {
            applied.retain(|id, _| live.contains(id));
        }
    }
}
