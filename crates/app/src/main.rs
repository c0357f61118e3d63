use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use kali_core::{
    audio, AppConfig, AssetManifest, AtlasKind, Event, KaliError, LessonCatalog, LessonSequencer,
    LessonSession, PresenterCall, RecordingPresenter,
};
use tracing_subscriber::EnvFilter;

fn main() -> kali_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            manifest,
            returning,
            events,
        } => run_simulate(config.as_deref(), manifest.as_deref(), returning, &events),
        Commands::CheckConfig {
            config,
            manifest,
            bundle,
        } => run_check(&config, manifest.as_deref(), bundle.as_deref()),
    }
}

/// One scripted step of a simulated session.
#[derive(Debug, Clone, Copy)]
enum Step {
    Deliver(Event),
    Idle,
    Activate,
    Deactivate,
    Crown,
}

fn parse_step(token: &str) -> kali_core::Result<Step> {
    let step = match token.trim().to_ascii_lowercase().as_str() {
        "tap" => Step::Deliver(Event::Tap),
        "done" => Step::Deliver(Event::AudioFinished { success: true }),
        "fail" => Step::Deliver(Event::AudioFinished { success: false }),
        "idle" => Step::Idle,
        "activate" => Step::Activate,
        "deactivate" => Step::Deactivate,
        "crown" => Step::Crown,
        other => return Err(KaliError::msg(format!("unknown simulation step `{other}`"))),
    };
    Ok(step)
}

fn load_config(path: Option<&Path>) -> kali_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn load_manifest(path: Option<&Path>, config: &AppConfig) -> kali_core::Result<AssetManifest> {
    match path {
        Some(path) => AssetManifest::load(path),
        None => Ok(AssetManifest::bundled(
            &LessonCatalog::new(config.timing.fps),
            &config.lesson.letters,
        )),
    }
}

fn run_simulate(
    config: Option<&Path>,
    manifest: Option<&Path>,
    returning: bool,
    events: &str,
) -> kali_core::Result<()> {
    let mut config = load_config(config)?;
    if returning {
        config.launch.first_launch = false;
    }
    let manifest = load_manifest(manifest, &config)?;
    let steps = events
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse_step)
        .collect::<kali_core::Result<Vec<_>>>()?;

    tracing::info!(steps = steps.len(), returning, "starting simulation");

    let mut session = LessonSession::new(&config, &manifest, RecordingPresenter::new())?;
    settle(&mut session)?;
    session.activate()?;
    settle(&mut session)?;

    let idle = config.timing.idle_timeout_secs;
    for step in steps {
        println!("> {step:?}");
        match step {
            Step::Deliver(event) => session.dispatch(event)?,
            Step::Idle => session.tick(idle)?,
            Step::Activate => session.activate()?,
            Step::Deactivate => session.deactivate(),
            Step::Crown => session.crown_rotated(1.0),
        }
        settle(&mut session)?;
        let state = session.state();
        if state.is_awaiting_tap() {
            println!("  state: {state} (waiting for a tap)");
        } else {
            println!("  state: {state}");
        }
    }

    let sequencer = session.sequencer();
    println!(
        "finished in {} after {} lesson(s), letter {}",
        sequencer.state(),
        sequencer.lessons_completed(),
        sequencer.current_letter()
    );
    Ok(())
}

/// Prints what the presenter was asked to do and completes any preloads,
/// standing in for the platform's background loader.
fn settle(session: &mut LessonSession<RecordingPresenter>) -> kali_core::Result<()> {
    loop {
        let calls = session.presenter_mut().drain();
        if calls.is_empty() {
            return Ok(());
        }

        for call in calls {
            println!("  {}", describe(&call));
            if let PresenterCall::Preload(atlas) = &call {
                if let Some(kind) = AtlasKind::from_atlas_name(atlas) {
                    session.dispatch(Event::AtlasLoaded(kind))?;
                }
            }
        }
    }
}

fn describe(call: &PresenterCall) -> String {
    match call {
        PresenterCall::Render {
            first_frame,
            frame_count,
            fps,
            repeats,
            background,
        } => format!(
            "render {frame_count} frame(s) from {} at {fps} fps{} on {background:?}",
            first_frame.as_deref().unwrap_or("-"),
            if *repeats { ", looping" } else { "" },
        ),
        PresenterCall::Play { clip, volume } => format!("play {clip} at volume {volume:.1}"),
        PresenterCall::Pause(clip) => format!("pause {clip}"),
        PresenterCall::Preload(atlas) => format!("preload {atlas}"),
        PresenterCall::Rotate(radians) => format!("rotate sprite to {radians:.3} rad"),
    }
}

fn run_check(
    config: &Path,
    manifest: Option<&Path>,
    bundle: Option<&Path>,
) -> kali_core::Result<()> {
    tracing::info!(?config, ?manifest, ?bundle, "checking configuration");

    let config = AppConfig::load(config)?;
    let manifest = load_manifest(manifest, &config)?;
    LessonSequencer::new(&config, &manifest)?;

    if let Some(bundle) = bundle {
        let catalog = LessonCatalog::new(config.timing.fps);
        for request in catalog.all_requests(&config.lesson.letters) {
            let path = audio::clip_path(bundle, &request.audio_clip);
            if !path.is_file() {
                return Err(KaliError::missing(format!(
                    "clip file {} does not exist",
                    path.display()
                )));
            }
        }
    }

    println!(
        "ok: {} letter(s), {:?} advancement",
        config.lesson.letters.len(),
        config.lesson.advance_policy
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Kali the Coder lesson sequencer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted lesson session against a recording presenter.
    Simulate {
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Optional JSON asset manifest; defaults to everything bundled.
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Play the short intro given to returning children.
        #[arg(long)]
        returning: bool,
        /// Comma separated steps: tap, done, fail, idle, activate, deactivate, crown.
        #[arg(short, long, default_value = "tap,done,done,tap,done,tap")]
        events: String,
    },
    /// Validate a configuration against an asset manifest.
    CheckConfig {
        /// JSON configuration file.
        config: PathBuf,
        /// Optional JSON asset manifest; defaults to everything bundled.
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Directory holding the bundled clips, checked for each `.m4a` file.
        #[arg(short, long)]
        bundle: Option<PathBuf>,
    },
}
