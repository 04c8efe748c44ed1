use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use hawkeye_core::alerts::infrastructure::telegram_notifier::notifier_from_env;
use hawkeye_core::events::infrastructure::file_capture_sink::FileCaptureSink;
use hawkeye_core::identity::domain::identity_store::IdentityStore;
use hawkeye_core::identity::infrastructure::json_identity_store::JsonIdentityStore;
use hawkeye_core::pipeline::infrastructure::jsonl_frame_source::JsonLinesFrameSource;
use hawkeye_core::pipeline::monitor_session::{FrameReport, MonitorSession};
use hawkeye_core::pipeline::monitor_stream_use_case::MonitorStreamUseCase;
use hawkeye_core::pipeline::pipeline_logger::LogPipelineLogger;
use hawkeye_core::shared::constants::{DEFAULT_FPS, TRACKER_MAX_AGE, TRACKER_N_INIT};
use hawkeye_core::shared::geometry::Zone;
use hawkeye_core::shared::settings::MonitorSettings;
use hawkeye_core::tracking::infrastructure::bytetrack_tracker::ByteTracker;

/// Loitering, trespassing, crowd and untrusted-face alerts for camera streams.
#[derive(Parser)]
#[command(name = "hawkeye")]
struct Cli {
    /// Settings file (default: platform config dir).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Identity store directory (default: platform data dir).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor recorded streams (JSON lines, one frame per line).
    Run(RunArgs),
    /// Manage trusted identities.
    Identities {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Inspect captured unknown faces.
    Captures {
        #[command(subcommand)]
        action: CaptureAction,
    },
    /// Show or initialise the settings file.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input recordings; each one is treated as a new stream.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Frame rate used when records carry no timestamp.
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: f64,

    /// Seconds a track must stay in view to count as loitering.
    #[arg(long)]
    loitering_threshold: Option<f64>,

    /// People count above which a crowd alert is raised.
    #[arg(long)]
    crowd_threshold: Option<usize>,

    /// Restricted zone as x1,y1,x2,y2.
    #[arg(long, value_parser = parse_zone)]
    zone: Option<Zone>,

    #[arg(long)]
    no_trespassing: bool,

    #[arg(long)]
    no_loitering: bool,

    #[arg(long)]
    no_crowd: bool,

    /// Embedding distance below which a face is recognized.
    #[arg(long)]
    match_threshold: Option<f64>,

    /// Seconds between repeated notifications of the same alert.
    #[arg(long)]
    cooldown: Option<f64>,

    /// Print each frame's alert summary as JSON to stdout.
    #[arg(long)]
    summaries: bool,
}

#[derive(Subcommand)]
enum IdentityAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        /// JSON file holding the face embedding as an array of numbers.
        #[arg(long)]
        embedding: PathBuf,
        /// Reference photo to keep alongside the identity.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Remove {
        id: u64,
    },
}

#[derive(Subcommand)]
enum CaptureAction {
    List,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings.
    Show,
    /// Write default settings.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Merge a JSON object into the settings file, e.g. '{"crowd_threshold_count": 8}'.
    Set {
        update: String,
    },
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
    let settings_path = match cli.settings {
        Some(path) => path,
        None => MonitorSettings::default_path()?,
    };
    let store_dir = match cli.store {
        Some(dir) => dir,
        None => JsonIdentityStore::default_dir().ok_or("Could not determine data directory")?,
    };

    match cli.command {
        Command::Run(args) => run_monitor(&args, &settings_path, &store_dir),
        Command::Identities { action } => run_identities(action, &store_dir),
        Command::Captures {
            action: CaptureAction::List,
        } => list_captures(&store_dir),
        Command::Settings { action } => run_settings(action, &settings_path),
    }
}

fn run_monitor(
    args: &RunArgs,
    settings_path: &Path,
    store_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    validate(args)?;
    let mut settings = MonitorSettings::load_or_default(settings_path)?;
    apply_overrides(&mut settings, args);
    settings.validate()?;

    let store = JsonIdentityStore::open(store_dir)?;
    let references = store.references()?;
    log::info!("Loaded {} trusted identities", references.len());

    let sink = FileCaptureSink::new(
        store_dir.join("captures"),
        Some(Box::new(JsonIdentityStore::open(store_dir)?)),
    );
    let tracker = ByteTracker::new(
        TRACKER_MAX_AGE,
        TRACKER_N_INIT,
        settings.confidence_threshold,
    );
    let mut session = MonitorSession::new(
        settings,
        references,
        Some(Box::new(tracker)),
        Box::new(sink),
        notifier_from_env(),
    );

    for (i, input) in args.inputs.iter().enumerate() {
        if i > 0 {
            session.restart_stream(store.references()?);
        }
        let on_report = args.summaries.then(|| {
            Box::new(|_index: usize, report: &FrameReport| {
                match serde_json::to_string(&report.summary) {
                    Ok(line) => println!("{line}"),
                    Err(e) => log::warn!("Failed to encode summary: {e}"),
                }
            }) as Box<dyn FnMut(usize, &FrameReport) + Send>
        });

        let mut use_case =
            MonitorStreamUseCase::new(Box::new(JsonLinesFrameSource::new(args.fps)), on_report, None);
        let mut logger = LogPipelineLogger::default();
        let stats = use_case.execute(input, &mut session, &mut logger)?;
        log::info!(
            "{}: {} frames, {} alerts sent, {} captures",
            input.display(),
            stats.frames,
            stats.alerts_fired,
            stats.captures
        );
        if stats.failed_notifications > 0 {
            log::warn!("{} notifications failed", stats.failed_notifications);
        }
    }
    Ok(())
}

fn run_identities(
    action: IdentityAction,
    store_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = JsonIdentityStore::open(store_dir)?;
    match action {
        IdentityAction::List => {
            for identity in store.references()? {
                println!(
                    "{}\t{}\t{} dims",
                    identity.id,
                    identity.name,
                    identity.embedding.len()
                );
            }
        }
        IdentityAction::Add {
            name,
            embedding,
            image,
        } => {
            let json = std::fs::read_to_string(&embedding)
                .map_err(|e| format!("Failed to read {}: {e}", embedding.display()))?;
            let vector: Vec<f32> = serde_json::from_str(&json)?;
            let id = store.add_reference(&name, vector, image)?;
            println!("{id}");
        }
        IdentityAction::Remove { id } => {
            if !store.remove_reference(id)? {
                return Err(format!("No identity with id {id}").into());
            }
            log::info!("Removed identity {id}");
        }
    }
    Ok(())
}

fn list_captures(store_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonIdentityStore::open(store_dir)?;
    for capture in store.captures()? {
        println!(
            "{}\t{}\t{}",
            capture.id,
            capture.timestamp,
            capture.image_path.display()
        );
    }
    Ok(())
}

fn run_settings(
    action: SettingsAction,
    settings_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SettingsAction::Show => {
            let settings = MonitorSettings::load_or_default(settings_path)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Init { force } => {
            if settings_path.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    settings_path.display()
                )
                .into());
            }
            MonitorSettings::default().save(settings_path)?;
            log::info!("Wrote default settings to {}", settings_path.display());
        }
        SettingsAction::Set { update } => {
            let settings = update_settings_file(settings_path, &update)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

/// Applies a partial JSON update to the settings file. The file is only
/// written when the merged settings are valid.
fn update_settings_file(
    settings_path: &Path,
    update: &str,
) -> Result<MonitorSettings, Box<dyn std::error::Error>> {
    let update: serde_json::Value = serde_json::from_str(update)?;
    let mut settings = MonitorSettings::load_or_default(settings_path)?;
    settings.apply_update(&update)?;
    settings.save(settings_path)?;
    log::info!("Updated settings in {}", settings_path.display());
    Ok(settings)
}

fn apply_overrides(settings: &mut MonitorSettings, args: &RunArgs) {
    if let Some(v) = args.loitering_threshold {
        settings.loitering_threshold_seconds = v;
    }
    if let Some(v) = args.crowd_threshold {
        settings.crowd_threshold_count = v;
    }
    if let Some(zone) = args.zone {
        settings.trespassing_zone = zone;
    }
    if let Some(v) = args.match_threshold {
        settings.identity_match_threshold = v;
    }
    if let Some(v) = args.cooldown {
        settings.alert_cooldown_seconds = v;
    }
    settings.trespassing_enabled &= !args.no_trespassing;
    settings.loitering_enabled &= !args.no_loitering;
    settings.crowd_enabled &= !args.no_crowd;
}

fn validate(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(format!("FPS must be positive, got {}", args.fps).into());
    }
    Ok(())
}

fn parse_zone(value: &str) -> Result<Zone, String> {
    let coords = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid zone coordinate: {e}"))?;
    match coords.as_slice() {
        [x1, y1, x2, y2] => Ok(Zone::new(*x1, *y1, *x2, *y2)),
        _ => Err(format!("expected x1,y1,x2,y2, got {} values", coords.len())),
    }
}
