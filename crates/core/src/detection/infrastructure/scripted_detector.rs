use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::detection::domain::face_detector::{DetectError, Detection, FaceDetector};
use crate::shared::image_id::ImageId;
use crate::shared::pixels::ImagePixels;

/// Deterministic detector backed by a per-image script.
///
/// Used by the CLI harness and tests in place of a real model: each image
/// id maps to a fixed detection list, an error, or (when absent) no faces.
/// Tracks call and concurrency counters so tests can assert the
/// scheduler's in-flight ceiling.
pub struct ScriptedDetector {
    script: Mutex<HashMap<ImageId, Result<Vec<Detection>, String>>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Simulated per-call model latency, so batch overlap is observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script_detections(&self, id: ImageId, detections: Vec<Detection>) {
        if let Ok(mut script) = self.script.lock() {
            script.insert(id, Ok(detections));
        }
    }

    pub fn script_error(&self, id: ImageId, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.insert(id, Err(message.to_string()));
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, pixels: &ImagePixels) -> Result<Vec<Detection>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let result = {
            let script = self
                .script
                .lock()
                .map_err(|e| -> DetectError { format!("Script lock poisoned: {e}").into() })?;
            match script.get(&pixels.source()) {
                Some(Ok(detections)) => Ok(detections.clone()),
                Some(Err(message)) => Err(message.clone().into()),
                None => Ok(Vec::new()),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
