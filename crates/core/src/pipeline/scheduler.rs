use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};

use crate::command::pipeline_state::PipelineState;
use crate::content::domain::content_tree::ContentTree;
use crate::detection::domain::face_detector::FaceDetector;
use crate::matching::domain::fingerprint::Fingerprint;
use crate::matching::domain::matcher::{MatchConfig, MatchError};
use crate::matching::domain::reference_set::ReferenceSet;
use crate::pipeline::lifecycle_tracker::LifecycleTracker;
use crate::pipeline::suppression_controller::SuppressionController;
use crate::shared::constants::{DEFAULT_BATCH_PAUSE, DEFAULT_MAX_CONCURRENT, MIN_FACE_IMAGE_DIM};
use crate::shared::image_id::ImageId;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Ceiling on images processed concurrently within one batch.
    pub max_concurrent: usize,
    /// Pause between batches so the host is never starved.
    pub batch_pause: Duration,
    /// Images smaller than this on either side skip detection entirely.
    pub min_dimension: u32,
    pub match_config: MatchConfig,
}

impl SchedulerConfig {
    pub fn new(match_config: MatchConfig) -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            batch_pause: DEFAULT_BATCH_PAUSE,
            min_dimension: MIN_FACE_IMAGE_DIM,
            match_config,
        }
    }
}

/// Outcome of evaluating one image, before it is committed to the tracker.
enum Evaluation {
    Completed { suppressed: bool },
    Skipped,
}

/// Bounded-concurrency worker pool draining the FIFO queue of
/// discovered images.
///
/// Batches of at most `max_concurrent` run on scoped threads and are
/// joined before the next batch starts, so no more than the ceiling is
/// ever in flight. A single drain guard prevents overlapping drain
/// cycles. Disabling or replacing the reference set stops new batches;
/// the in-flight batch always commits its results.
pub struct Scheduler {
    queue: Mutex<VecDeque<ImageId>>,
    draining: AtomicBool,
    tree: Arc<dyn ContentTree>,
    detector: Arc<dyn FaceDetector>,
    tracker: Arc<Mutex<LifecycleTracker>>,
    suppression: Arc<SuppressionController>,
    state: Arc<PipelineState>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        tree: Arc<dyn ContentTree>,
        detector: Arc<dyn FaceDetector>,
        tracker: Arc<Mutex<LifecycleTracker>>,
        suppression: Arc<SuppressionController>,
        state: Arc<PipelineState>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            tree,
            detector,
            tracker,
            suppression,
            state,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Offers an image to the queue. Refused when the tracker already
    /// knows it (queued, in flight, or terminal).
    pub fn enqueue(&self, id: ImageId) -> bool {
        let admitted = self
            .tracker
            .lock()
            .map(|mut tracker| tracker.begin_queued(id))
            .unwrap_or(false);
        if admitted {
            if let Ok(mut queue) = self.queue.lock() {
                queue.push_back(id);
            }
        }
        admitted
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Drops every pending entry and returns the affected images to the
    /// undiscovered state. In-flight work is not touched.
    pub fn clear_queue(&self) {
        let drained: Vec<ImageId> = self
            .queue
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default();
        if drained.is_empty() {
            return;
        }
        if let Ok(mut tracker) = self.tracker.lock() {
            for id in &drained {
                tracker.release_queued(*id);
            }
        }
        debug!("queue cleared ({} pending entries dropped)", drained.len());
    }

    /// Drains the queue in batches until it is empty, the feature is
    /// disabled, or the reference set becomes empty. Re-entrant calls
    /// while a drain is running return immediately; work they enqueued
    /// is picked up by the running thread before it lets go.
    pub fn drain(&self) {
        while self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.drain_batches();
            self.draining.store(false, Ordering::SeqCst);

            // An enqueue can land between the last emptiness check and
            // the guard release. That caller's own drain call found the
            // guard still held and returned, so the work is ours.
            if !self.state.is_enabled()
                || self.state.references().is_empty()
                || self.queue_len() == 0
            {
                break;
            }
        }
    }

    fn drain_batches(&self) {
        loop {
            if !self.state.is_enabled() {
                break;
            }
            // Snapshot per batch: a wholesale replacement mid-drain is
            // picked up at the next batch boundary.
            let references = self.state.references();
            if references.is_empty() {
                break;
            }

            let batch: Vec<ImageId> = {
                let Ok(mut queue) = self.queue.lock() else {
                    break;
                };
                let take = self.config.max_concurrent.min(queue.len());
                queue.drain(..take).collect()
            };
            if batch.is_empty() {
                break;
            }

            std::thread::scope(|scope| {
                for id in &batch {
                    let id = *id;
                    let references = &references;
                    scope.spawn(move || self.process_one(id, references));
                }
            });

            let more_pending = self.queue_len() > 0;
            if !more_pending {
                break;
            }
            std::thread::sleep(self.config.batch_pause);
        }
    }

    /// Runs the full per-item sequence for one image. Every failure is
    /// caught and committed as `Failed`; nothing here may abort the
    /// batch.
    fn process_one(&self, id: ImageId, references: &ReferenceSet) {
        {
            let Ok(mut tracker) = self.tracker.lock() else {
                return;
            };
            if tracker.state(id).is_some_and(|s| s.is_terminal()) {
                return;
            }
            // Idempotent short-circuit: an already-suppressed image
            // counts as processed without re-running detection.
            if self.suppression.is_suppressed(id) {
                tracker.finish_processed(id, true);
                return;
            }
            if !tracker.begin_processing(id) {
                return;
            }
        }

        let outcome = self.evaluate(id, references);

        let Ok(mut tracker) = self.tracker.lock() else {
            return;
        };
        match outcome {
            Ok(Evaluation::Completed { suppressed }) => {
                tracker.finish_processed(id, suppressed);
            }
            Ok(Evaluation::Skipped) => {
                tracker.finish_processed(id, false);
            }
            Err(e) => {
                warn!("{id}: processing failed: {e}");
                tracker.finish_failed(id);
            }
        }
    }

    fn evaluate(
        &self,
        id: ImageId,
        references: &ReferenceSet,
    ) -> Result<Evaluation, Box<dyn std::error::Error + Send + Sync>> {
        if let Some((w, h)) = self.tree.dimensions(id) {
            if w < self.config.min_dimension || h < self.config.min_dimension {
                return Ok(Evaluation::Skipped);
            }
        }

        let pixels = self.tree.probe_pixels(id)?;
        let detections = self.detector.detect(&pixels)?;
        if detections.is_empty() {
            return Ok(Evaluation::Completed { suppressed: false });
        }

        let scheme = self.config.match_config.scheme;
        let fingerprints: Vec<Fingerprint> = detections
            .iter()
            .filter_map(|d| Fingerprint::from_detection(d, scheme))
            .collect();
        if fingerprints.is_empty() {
            debug!("{id}: detections carry no {scheme} data");
            return Ok(Evaluation::Completed { suppressed: false });
        }

        let matched = references
            .matches_any(&fingerprints, &self.config.match_config)
            .map_err(|e: MatchError| {
                error!("{id}: fingerprint contract violation: {e}");
                debug_assert!(false, "fingerprint contract violation: {e}");
                e
            })?;

        if matched {
            self.suppression.apply(id);
        }
        Ok(Evaluation::Completed { suppressed: matched })
    }
}
