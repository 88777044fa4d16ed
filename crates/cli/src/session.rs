use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use feedveil_core::command::command_router::Command;
use feedveil_core::detection::domain::face_detector::Detection;
use feedveil_core::matching::domain::fingerprint::{Fingerprint, FingerprintScheme};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to read session file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse session file: {0}")]
    Parse(#[source] serde_json::Error),
}

/// A scripted feed session: the fingerprint scheme, the initial
/// reference set, and a timeline of feed mutations and commands.
#[derive(Debug, Deserialize)]
pub struct Session {
    pub scheme: FingerprintScheme,
    #[serde(default)]
    pub references: Vec<Fingerprint>,
    pub events: Vec<SessionEvent>,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path).map_err(SessionError::Read)?;
        serde_json::from_str(&json).map_err(SessionError::Parse)
    }
}

/// How a scripted image answers the pixel read-probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    #[default]
    Readable,
    CrossOrigin,
    DecodeError,
}

fn default_loaded() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new image appears in the feed.
    AddImage {
        id: u64,
        width: u32,
        height: u32,
        #[serde(default = "default_loaded")]
        loaded: bool,
        #[serde(default)]
        probe: Probe,
        #[serde(default)]
        detections: Vec<Detection>,
        /// Scripts a detection failure instead of results.
        #[serde(default)]
        detect_error: Option<String>,
    },
    /// A previously-added image finishes loading.
    ImageLoaded { id: u64 },
    /// An image leaves the feed.
    RemoveImage { id: u64 },
    /// An inbound command on the command channel.
    Command {
        #[serde(flatten)]
        command: Command,
    },
    /// Waits for background processing before the next event.
    Settle { ms: u64 },
}
