use std::collections::{HashMap, HashSet};

use log::debug;

use crate::shared::image_id::ImageId;

/// Where a discovered image sits in the pipeline. Undiscovered images
/// simply have no entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Queued,
    Processing,
    Processed,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Processed | LifecycleState::Failed)
    }
}

/// Set-membership store classifying each discovered image into disjoint
/// lifecycle states, with the `suppressed` overlay (valid only for
/// `Processed`) and the load-readiness poll counters.
///
/// Transitions are owned by the scheduler, except the terminal reset
/// driven by the command router on reference-set replacement.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    states: HashMap<ImageId, LifecycleState>,
    suppressed: HashSet<ImageId>,
    load_attempts: HashMap<ImageId, u32>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: ImageId) -> Option<LifecycleState> {
        self.states.get(&id).copied()
    }

    pub fn is_tracked(&self, id: ImageId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn is_suppressed(&self, id: ImageId) -> bool {
        self.suppressed.contains(&id)
    }

    /// Admits an image into `Queued`. Refused for anything already
    /// tracked: a terminal image never re-enters the queue, and a
    /// queued or processing one is not offered twice.
    pub fn begin_queued(&mut self, id: ImageId) -> bool {
        if self.states.contains_key(&id) {
            return false;
        }
        self.states.insert(id, LifecycleState::Queued);
        self.load_attempts.remove(&id);
        debug!("{id}: queued");
        true
    }

    /// Moves a queued image into `Processing`.
    pub fn begin_processing(&mut self, id: ImageId) -> bool {
        match self.states.get(&id) {
            Some(LifecycleState::Queued) => {
                self.states.insert(id, LifecycleState::Processing);
                debug!("{id}: processing");
                true
            }
            _ => false,
        }
    }

    pub fn finish_processed(&mut self, id: ImageId, suppressed: bool) {
        self.states.insert(id, LifecycleState::Processed);
        if suppressed {
            self.suppressed.insert(id);
        } else {
            self.suppressed.remove(&id);
        }
        debug!("{id}: processed (suppressed={suppressed})");
    }

    pub fn finish_failed(&mut self, id: ImageId) {
        self.states.insert(id, LifecycleState::Failed);
        self.suppressed.remove(&id);
        debug!("{id}: failed");
    }

    /// Drops a queued image back to undiscovered. Used when the pending
    /// queue is cleared; terminal and in-flight states are untouched.
    pub fn release_queued(&mut self, id: ImageId) {
        if self.states.get(&id) == Some(&LifecycleState::Queued) {
            self.states.remove(&id);
        }
    }

    /// Counts one readiness poll and reports the total so far.
    pub fn record_load_attempt(&mut self, id: ImageId) -> u32 {
        let attempts = self.load_attempts.entry(id).or_insert(0);
        *attempts += 1;
        *attempts
    }

    /// Reference-set replacement reset: clears `Processed`/`Failed`/
    /// `suppressed` membership and returns the previously-processed ids,
    /// each eligible for requeueing exactly once. Queued and in-flight
    /// entries are left alone.
    pub fn reset_for_rescan(&mut self) -> Vec<ImageId> {
        let mut requeue: Vec<ImageId> = self
            .states
            .iter()
            .filter(|(_, s)| **s == LifecycleState::Processed)
            .map(|(id, _)| *id)
            .collect();
        requeue.sort();
        self.states.retain(|_, s| !s.is_terminal());
        self.suppressed.clear();
        debug!("rescan reset: {} images eligible for requeue", requeue.len());
        requeue
    }

    /// Clears the suppressed overlay without touching lifecycle states.
    pub fn clear_suppressed(&mut self) {
        self.suppressed.clear();
    }

    /// Evicts state for images no longer present in the content tree.
    pub fn retain_present(&mut self, live: &HashSet<ImageId>) {
        self.states.retain(|id, _| live.contains(id));
        self.suppressed.retain(|id| live.contains(id));
        self.load_attempts.retain(|id, _| live.contains(id));
    }

    /// Snapshot of every tracked image for reporting.
    pub fn snapshot(&self) -> Vec<(ImageId, LifecycleState, bool)> {
        let mut entries: Vec<_> = self
            .states
            .iter()
            .map(|(id, s)| (*id, *s, self.suppressed.contains(id)))
            .collect();
        entries.sort_by_key(|(id, _, _)| *id);
        entries
    }

    pub fn count_in(&self, state: LifecycleState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }
}
