mod session;

use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use feedveil_core::command::command_router::CommandRouter;
use feedveil_core::command::pipeline_state::PipelineState;
use feedveil_core::command::stored_settings::StoredSettings;
use feedveil_core::content::domain::content_tree::ContentTree;
use feedveil_core::content::infrastructure::memory_tree::{MemoryTree, ProbeBehavior};
use feedveil_core::detection::infrastructure::scripted_detector::ScriptedDetector;
use feedveil_core::matching::domain::fingerprint::Fingerprint;
use feedveil_core::matching::domain::matcher::MatchConfig;
use feedveil_core::matching::domain::reference_set::ReferenceSet;
use feedveil_core::pipeline::discovery_observer::{Discovery, DiscoveryObserver, MutationEvent};
use feedveil_core::pipeline::lifecycle_tracker::{LifecycleState, LifecycleTracker};
use feedveil_core::pipeline::scheduler::{Scheduler, SchedulerConfig};
use feedveil_core::pipeline::suppression_controller::SuppressionController;
use feedveil_core::shared::image_id::ImageId;

use session::{Probe, Session, SessionEvent};

/// Replays a scripted feed session through the suppression pipeline and
/// reports the final lifecycle of every image.
#[derive(Parser)]
#[command(name = "feedveil")]
struct Cli {
    /// Session script (JSON).
    session: PathBuf,

    /// Max images processed concurrently per batch.
    #[arg(long, default_value = "5")]
    max_concurrent: usize,

    /// Mutation debounce quiet interval in milliseconds.
    #[arg(long, default_value = "50")]
    debounce_ms: u64,

    /// Euclidean distance threshold for embedding matching.
    #[arg(long, default_value = "0.6")]
    embedding_threshold: f64,

    /// Normalized Hamming gate for hash matching.
    #[arg(long, default_value = "0.3")]
    hamming_gate: f64,

    /// Landmark refinement threshold for hash matching.
    #[arg(long, default_value = "0.15")]
    landmark_threshold: f64,

    /// Final wait for background processing in milliseconds.
    #[arg(long, default_value = "500")]
    settle_ms: u64,

    /// Start with the feature enabled. Overrides stored settings.
    #[arg(long, action = clap::ArgAction::Set)]
    enabled: Option<bool>,

    /// Settings file seeding startup state and persisting command updates.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let script = Session::load(&cli.session)?;

    let stored = cli.settings.as_deref().map(StoredSettings::load_from);
    let (enabled, reference_fingerprints) = startup_state(&script, stored.as_ref(), cli.enabled);
    let references = ReferenceSet::new(reference_fingerprints)?;
    let mut match_config = MatchConfig::for_scheme(script.scheme);
    match_config.embedding_threshold = cli.embedding_threshold;
    match_config.hamming_gate = cli.hamming_gate;
    match_config.landmark_threshold = cli.landmark_threshold;

    let tree = Arc::new(MemoryTree::new());
    let detector = Arc::new(ScriptedDetector::new());
    let tracker = Arc::new(Mutex::new(LifecycleTracker::new()));
    let suppression = Arc::new(SuppressionController::new(tree.clone()));
    let state = Arc::new(PipelineState::new(enabled, references));

    let mut scheduler_config = SchedulerConfig::new(match_config);
    scheduler_config.max_concurrent = cli.max_concurrent.max(1);
    let scheduler = Arc::new(Scheduler::new(
        tree.clone(),
        detector.clone(),
        tracker.clone(),
        suppression.clone(),
        state.clone(),
        scheduler_config,
    ));

    let discovery = Discovery {
        tree: tree.clone(),
        tracker: tracker.clone(),
        suppression: suppression.clone(),
        scheduler,
        state,
    };
    let observer = DiscoveryObserver::spawn(discovery.clone(), Duration::from_millis(cli.debounce_ms));
    let mut router = CommandRouter::new(discovery.clone());
    if let Some(path) = &cli.settings {
        router = router.with_settings_path(path.clone());
    }

    replay(&script, &tree, &detector, &observer, &router);

    std::thread::sleep(Duration::from_millis(cli.settle_ms));
    observer.shutdown();

    report(&tree, &tracker, &suppression);
    Ok(())
}

/// Resolves startup state: session references win over stored ones, and
/// an explicit `--enabled` flag wins over the stored enabled flag.
fn startup_state(
    script: &Session,
    stored: Option<&StoredSettings>,
    enabled_flag: Option<bool>,
) -> (bool, Vec<Fingerprint>) {
    let enabled = enabled_flag.unwrap_or_else(|| stored.map_or(true, |s| s.enabled));
    let references = if script.references.is_empty() {
        stored
            .map(|s| s.reference_fingerprints.clone())
            .unwrap_or_default()
    } else {
        script.references.clone()
    };
    (enabled, references)
}

fn replay(
    script: &Session,
    tree: &MemoryTree,
    detector: &ScriptedDetector,
    observer: &DiscoveryObserver,
    router: &CommandRouter,
) {
    log::info!("replaying {} events", script.events.len());
    for event in &script.events {
        match event {
            SessionEvent::AddImage {
                id,
                width,
                height,
                loaded,
                probe,
                detections,
                detect_error,
            } => {
                let id = ImageId(*id);
                tree.insert_with_probe(id, *width, *height, *loaded, probe_behavior(*probe));
                if let Some(message) = detect_error {
                    detector.script_error(id, message);
                } else if !detections.is_empty() {
                    detector.script_detections(id, detections.clone());
                }
                observer.notify(MutationEvent::NodesAdded(vec![id]));
            }
            SessionEvent::ImageLoaded { id } => {
                let id = ImageId(*id);
                tree.mark_loaded(id);
                observer.notify(MutationEvent::ImageLoaded(id));
            }
            SessionEvent::RemoveImage { id } => {
                let id = ImageId(*id);
                tree.remove(id);
                observer.notify(MutationEvent::NodesRemoved(vec![id]));
            }
            SessionEvent::Command { command } => {
                let ack = router.handle(command.clone());
                match ack.error {
                    None => println!("command acked"),
                    Some(error) => println!("command rejected: {error}"),
                }
            }
            SessionEvent::Settle { ms } => {
                std::thread::sleep(Duration::from_millis(*ms));
            }
        }
    }
}

fn probe_behavior(probe: Probe) -> ProbeBehavior {
    match probe {
        Probe::Readable => ProbeBehavior::Readable,
        Probe::CrossOrigin => ProbeBehavior::CrossOrigin,
        Probe::DecodeError => ProbeBehavior::DecodeError,
    }
}

fn report(
    tree: &MemoryTree,
    tracker: &Mutex<LifecycleTracker>,
    suppression: &SuppressionController,
) {
    let Ok(tracker) = tracker.lock() else {
        return;
    };

    println!();
    println!("{:<10} {:<12} {:<10} filter", "image", "state", "suppressed");
    for (id, state, suppressed) in tracker.snapshot() {
        let filter = tree.visual_filter(id).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<12} {:<10} {filter}",
            id.to_string(),
            state_name(state),
            suppressed
        );
    }

    println!();
    println!(
        "queued={} processing={} processed={} failed={} suppressed={}",
        tracker.count_in(LifecycleState::Queued),
        tracker.count_in(LifecycleState::Processing),
        tracker.count_in(LifecycleState::Processed),
        tracker.count_in(LifecycleState::Failed),
        suppression.suppressed_ids().len(),
    );
}

fn state_name(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::Queued => "queued",
        LifecycleState::Processing => "processing",
        LifecycleState::Processed => "processed",
        LifecycleState::Failed => "failed",
    }
}
