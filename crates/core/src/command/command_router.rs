use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::command::stored_settings::StoredSettings;
use crate::matching::domain::fingerprint::Fingerprint;
use crate::matching::domain::reference_set::ReferenceSet;
use crate::pipeline::discovery_observer::Discovery;
use crate::shared::constants::ENABLE_SETTLE_DELAY;

/// Inbound command from the host's command channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    ToggleBlur { enabled: bool },
    ScanPage,
    UpdateReferences { fingerprints: Vec<Fingerprint> },
}

/// Immediate acknowledgement. Never a completion signal: background
/// processing continues after the ack is returned.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ack {
    pub ok: bool,
    pub error: Option<String>,
}

impl Ack {
    fn accepted() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn rejected(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}

/// External-facing dispatch table translating inbound commands into
/// scheduler and tracker operations.
///
/// Owns the process-scoped state through the `Discovery` handles. Every
/// command acks synchronously; discovery passes and drains run on
/// spawned threads so ack latency is independent of processing time.
pub struct CommandRouter {
    discovery: Discovery,
    settle_delay: Duration,
    settings_path: Option<PathBuf>,
}

impl CommandRouter {
    pub fn new(discovery: Discovery) -> Self {
        Self {
            discovery,
            settle_delay: ENABLE_SETTLE_DELAY,
            settings_path: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Opts in to persisting state after toggle and reference updates.
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    pub fn handle(&self, command: Command) -> Ack {
        match command {
            Command::ToggleBlur { enabled } => self.toggle(enabled),
            Command::ScanPage => self.rescan(),
            Command::UpdateReferences { fingerprints } => self.update_references(fingerprints),
        }
    }

    fn toggle(&self, enabled: bool) -> Ack {
        debug!("command: toggle blur -> {enabled}");
        self.discovery.state.set_enabled(enabled);
        if enabled {
            // Full discovery after a short settle so late DOM churn from
            // the toggle itself is captured in one pass.
            let discovery = self.discovery.clone();
            let settle = self.settle_delay;
            std::thread::spawn(move || {
                std::thread::sleep(settle);
                discovery.pass_and_drain();
            });
        } else {
            self.discovery.suppression.remove_all();
            if let Ok(mut tracker) = self.discovery.tracker.lock() {
                tracker.clear_suppressed();
            }
            // In-flight batch items still complete; nothing new starts.
            self.discovery.scheduler.clear_queue();
        }
        self.persist();
        Ack::accepted()
    }

    fn rescan(&self) -> Ack {
        debug!("command: rescan");
        self.discovery.scheduler.clear_queue();
        let discovery = self.discovery.clone();
        std::thread::spawn(move || discovery.pass_and_drain());
        Ack::accepted()
    }

    fn update_references(&self, fingerprints: Vec<Fingerprint>) -> Ack {
        let references = match ReferenceSet::new(fingerprints) {
            Ok(references) => references,
            Err(e) => {
                warn!("command: reference update rejected: {e}");
                return Ack::rejected(e.to_string());
            }
        };
        debug!(
            "command: replace references ({} fingerprints)",
            references.len()
        );

        self.discovery.state.replace_references(references);
        self.discovery.suppression.remove_all();

        let requeue = self
            .discovery
            .tracker
            .lock()
            .map(|mut tracker| tracker.reset_for_rescan())
            .unwrap_or_default();
        for id in requeue {
            self.discovery.scheduler.enqueue(id);
        }

        self.persist();

        if self.discovery.state.is_enabled() && !self.discovery.state.references().is_empty() {
            let discovery = self.discovery.clone();
            std::thread::spawn(move || discovery.pass_and_drain());
        }
        Ack::accepted()
    }

    fn persist(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        let settings = StoredSettings {
            enabled: self.discovery.state.is_enabled(),
            reference_fingerprints: self.discovery.state.references().fingerprints().to_vec(),
        };
        if let Err(e) = settings.save_to(path) {
            warn!("failed to persist settings: {e}");
        }
    }
}
