use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};

use crate::command::pipeline_state::PipelineState;
use crate::content::domain::content_tree::ContentTree;
use crate::pipeline::lifecycle_tracker::LifecycleTracker;
use crate::pipeline::scheduler::Scheduler;
use crate::pipeline::suppression_controller::SuppressionController;
use crate::shared::constants::MAX_LOAD_ATTEMPTS;
use crate::shared::image_id::ImageId;

/// Structural change notification from the host's content tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationEvent {
    NodesAdded(Vec<ImageId>),
    NodesRemoved(Vec<ImageId>),
    ImageLoaded(ImageId),
}

/// Timer-gated coalescing buffer: accumulates candidate identities from
/// a burst of mutation events and answers whether the quiet period has
/// elapsed against an injected clock.
#[derive(Debug, Default)]
pub struct DebounceBuffer {
    candidates: HashSet<ImageId>,
    last_event: Option<Instant>,
}

impl DebounceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, event: &MutationEvent, now: Instant) {
        match event {
            MutationEvent::NodesAdded(ids) => self.candidates.extend(ids.iter().copied()),
            MutationEvent::ImageLoaded(id) => {
                self.candidates.insert(*id);
            }
            // Removals only dirty the buffer; eviction happens in the pass.
            MutationEvent::NodesRemoved(_) => {}
        }
        self.last_event = Some(now);
    }

    /// True once a full quiet interval has passed since the last event.
    pub fn is_quiet(&self, now: Instant, quiet: Duration) -> bool {
        match self.last_event {
            Some(last) => now.duration_since(last) >= quiet,
            None => false,
        }
    }

    /// Empties the buffer for the next burst.
    pub fn take(&mut self) -> HashSet<ImageId> {
        self.last_event = None;
        std::mem::take(&mut self.candidates)
    }
}

/// Everything a discovery pass touches, bundled so the observer thread,
/// the command router, and tests can run passes over the same handles.
#[derive(Clone)]
pub struct Discovery {
    pub tree: Arc<dyn ContentTree>,
    pub tracker: Arc<Mutex<LifecycleTracker>>,
    pub suppression: Arc<SuppressionController>,
    pub scheduler: Arc<Scheduler>,
    pub state: Arc<PipelineState>,
}

impl Discovery {
    /// One discovery pass: evict state for removed images, then offer
    /// every eligible untracked image to the scheduler's queue.
    ///
    /// No-op while the feature is disabled or the reference set is
    /// empty. Returns the number of images enqueued.
    pub fn pass(&self) -> usize {
        if !self.state.is_enabled() || self.state.references().is_empty() {
            trace!("discovery pass skipped (disabled or no references)");
            return 0;
        }

        let live: HashSet<ImageId> = self.tree.image_ids().into_iter().collect();
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.retain_present(&live);
        }
        self.suppression.retain_present(&live);

        let min_dim = self.scheduler.config().min_dimension;
        let mut enqueued = 0;
        for id in self.tree.image_ids() {
            let already_tracked = self
                .tracker
                .lock()
                .map(|t| t.is_tracked(id))
                .unwrap_or(true);
            if already_tracked {
                continue;
            }

            // Readiness gate: unloaded images are re-offered on later
            // passes, up to the polling bound.
            if !self.tree.is_loaded(id) {
                if let Ok(mut tracker) = self.tracker.lock() {
                    let attempts = tracker.record_load_attempt(id);
                    if attempts > MAX_LOAD_ATTEMPTS {
                        debug!("{id}: never finished loading, giving up");
                        tracker.finish_failed(id);
                    }
                }
                continue;
            }

            // Size gate: too small to carry a meaningful face. Completed
            // outright, never observable as queued.
            match self.tree.dimensions(id) {
                Some((w, h)) if w >= min_dim && h >= min_dim => {}
                _ => {
                    if let Ok(mut tracker) = self.tracker.lock() {
                        tracker.finish_processed(id, false);
                    }
                    continue;
                }
            }

            if self.scheduler.enqueue(id) {
                enqueued += 1;
            }
        }

        if enqueued > 0 {
            debug!("discovery pass enqueued {enqueued} images");
        }
        enqueued
    }

    pub fn pass_and_drain(&self) {
        if self.pass() > 0 || self.scheduler.queue_len() > 0 {
            self.scheduler.drain();
        }
    }
}

/// Watches the mutation event channel and coalesces bursts into single
/// discovery passes per quiet interval.
///
/// The channel timeout is the debounce timer: after the first event of a
/// burst, the thread keeps absorbing until `quiet` elapses with no new
/// event, then runs one pass. Dropping the handle closes the channel and
/// stops the thread after a final flush.
pub struct DiscoveryObserver {
    tx: Option<Sender<MutationEvent>>,
    join: Option<JoinHandle<()>>,
}

impl DiscoveryObserver {
    pub fn spawn(discovery: Discovery, quiet: Duration) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<MutationEvent>();
        let join = std::thread::spawn(move || observe(rx, discovery, quiet));
        Self {
            tx: Some(tx),
            join: Some(join),
        }
    }

    /// Offers a mutation notification. Never blocks; events arriving
    /// after shutdown are dropped.
    pub fn notify(&self, event: MutationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Closes the channel and waits for the final flush.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for DiscoveryObserver {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn observe(rx: Receiver<MutationEvent>, discovery: Discovery, quiet: Duration) {
    let mut buffer = DebounceBuffer::new();
    loop {
        // Idle until a burst starts.
        let Ok(event) = rx.recv() else {
            break;
        };
        buffer.absorb(&event, Instant::now());

        // Absorb the rest of the burst until the buffer reports a full
        // quiet interval with no new event.
        while !buffer.is_quiet(Instant::now(), quiet) {
            match rx.recv_timeout(quiet) {
                Ok(event) => buffer.absorb(&event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    let candidates = buffer.take();
                    trace!("observer flushing {} candidates on shutdown", candidates.len());
                    discovery.pass_and_drain();
                    return;
                }
            }
        }

        let candidates = buffer.take();
        trace!("observer flushing burst of {} candidates", candidates.len());
        discovery.pass_and_drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::infrastructure::memory_tree::MemoryTree;
    use crate::detection::infrastructure::scripted_detector::ScriptedDetector;
    use crate::matching::domain::fingerprint::{Fingerprint, FingerprintScheme};
    use crate::matching::domain::matcher::MatchConfig;
    use crate::matching::domain::reference_set::ReferenceSet;
    use crate::pipeline::lifecycle_tracker::LifecycleState;
    use crate::pipeline::scheduler::SchedulerConfig;
    use crate::shared::bounding_box::BoundingBox;

    fn references() -> ReferenceSet {
        ReferenceSet::new(vec![Fingerprint::Embedding {
            vector: vec![0.1, 0.2],
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        }])
        .unwrap()
    }

    fn discovery(enabled: bool) -> (Arc<MemoryTree>, Discovery) {
        let tree = Arc::new(MemoryTree::new());
        let detector = Arc::new(ScriptedDetector::new());
        let tracker = Arc::new(Mutex::new(LifecycleTracker::new()));
        let suppression = Arc::new(SuppressionController::new(tree.clone()));
        let state = Arc::new(PipelineState::new(enabled, references()));
        let scheduler = Arc::new(Scheduler::new(
            tree.clone(),
            detector,
            tracker.clone(),
            suppression.clone(),
            state.clone(),
            SchedulerConfig::new(MatchConfig::for_scheme(FingerprintScheme::Embedding)),
        ));
        let discovery = Discovery {
            tree: tree.clone(),
            tracker,
            suppression,
            scheduler,
            state,
        };
        (tree, discovery)
    }

    // ── DebounceBuffer ──────────────────────────────────────────────

    #[test]
    fn test_buffer_coalesces_burst() {
        let mut buffer = DebounceBuffer::new();
        let start = Instant::now();
        buffer.absorb(&MutationEvent::NodesAdded(vec![ImageId(1), ImageId(2)]), start);
        buffer.absorb(&MutationEvent::NodesAdded(vec![ImageId(2)]), start);
        buffer.absorb(&MutationEvent::ImageLoaded(ImageId(3)), start);
        assert_eq!(buffer.take().len(), 3);
        assert!(buffer.take().is_empty());
    }

    #[test]
    fn test_buffer_quiet_only_after_interval() {
        let mut buffer = DebounceBuffer::new();
        let start = Instant::now();
        let quiet = Duration::from_millis(300);
        assert!(!buffer.is_quiet(start, quiet));
        buffer.absorb(&MutationEvent::NodesAdded(vec![ImageId(1)]), start);
        assert!(!buffer.is_quiet(start + Duration::from_millis(100), quiet));
        assert!(buffer.is_quiet(start + Duration::from_millis(300), quiet));
        // A late event restarts the window.
        buffer.absorb(
            &MutationEvent::NodesAdded(vec![ImageId(2)]),
            start + Duration::from_millis(250),
        );
        assert!(!buffer.is_quiet(start + Duration::from_millis(400), quiet));
    }

    // ── Discovery pass ──────────────────────────────────────────────

    #[test]
    fn test_pass_enqueues_eligible_images() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, true);
        tree.insert(ImageId(2), 400, 300, true);
        assert_eq!(discovery.pass(), 2);
        assert_eq!(discovery.scheduler.queue_len(), 2);
    }

    #[test]
    fn test_pass_skips_tracked_images() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, true);
        assert_eq!(discovery.pass(), 1);
        assert_eq!(discovery.pass(), 0);
    }

    #[test]
    fn test_pass_noop_while_disabled() {
        let (tree, discovery) = discovery(false);
        tree.insert(ImageId(1), 400, 300, true);
        assert_eq!(discovery.pass(), 0);
        assert_eq!(discovery.scheduler.queue_len(), 0);
    }

    #[test]
    fn test_pass_noop_with_empty_references() {
        let (tree, discovery) = discovery(true);
        discovery.state.replace_references(ReferenceSet::empty());
        tree.insert(ImageId(1), 400, 300, true);
        assert_eq!(discovery.pass(), 0);
    }

    #[test]
    fn test_small_image_completes_without_queueing() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 50, 400, true);
        assert_eq!(discovery.pass(), 0);
        let tracker = discovery.tracker.lock().unwrap();
        assert_eq!(tracker.state(ImageId(1)), Some(LifecycleState::Processed));
        assert!(!tracker.is_suppressed(ImageId(1)));
    }

    #[test]
    fn test_unloaded_image_polled_then_failed() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, false);

        for _ in 0..MAX_LOAD_ATTEMPTS {
            assert_eq!(discovery.pass(), 0);
            assert_eq!(discovery.tracker.lock().unwrap().state(ImageId(1)), None);
        }
        // One poll past the bound gives up.
        discovery.pass();
        assert_eq!(
            discovery.tracker.lock().unwrap().state(ImageId(1)),
            Some(LifecycleState::Failed)
        );
    }

    #[test]
    fn test_unloaded_image_enqueued_once_loaded() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, false);
        assert_eq!(discovery.pass(), 0);
        tree.mark_loaded(ImageId(1));
        assert_eq!(discovery.pass(), 1);
    }

    #[test]
    fn test_pass_evicts_removed_images() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, true);
        discovery.pass();
        tree.remove(ImageId(1));
        tree.insert(ImageId(2), 400, 300, true);
        discovery.pass();
        let tracker = discovery.tracker.lock().unwrap();
        assert!(!tracker.is_tracked(ImageId(1)));
        assert!(tracker.is_tracked(ImageId(2)));
    }

    // ── Observer thread ─────────────────────────────────────────────

    #[test]
    fn test_observer_debounces_burst_into_one_pass() {
        let (tree, discovery) = discovery(true);
        tree.insert(ImageId(1), 400, 300, true);
        tree.insert(ImageId(2), 400, 300, true);

        let observer = DiscoveryObserver::spawn(discovery.clone(), Duration::from_millis(20));
        observer.notify(MutationEvent::NodesAdded(vec![ImageId(1)]));
        observer.notify(MutationEvent::NodesAdded(vec![ImageId(2)]));
        std::thread::sleep(Duration::from_millis(150));
        observer.shutdown();

        let tracker = discovery.tracker.lock().unwrap();
        assert_eq!(tracker.count_in(LifecycleState::Processed), 2);
    }
}
