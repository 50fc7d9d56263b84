//! Headless prompter host.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load the script and user configuration from `conf/config.toml`.
//! - Drive one prompter session through the frame loop, feeding it a
//!   recorded recognition log if one was given.
//! - Print the final session snapshot as JSON.

mod replay;

use crate::replay::{Replay, ReplayEngine, load_replay};
use anyhow::{Context, Result, anyhow};
use prompter_core::config::{FollowStrategy, load_config};
use prompter_core::driver::{FrameClock, IntervalClock, SimulatedClock, run_frame_loop};
use prompter_core::{PrompterSession, SessionCommand};
use std::env;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: prompter <script.txt> [--replay events.jsonl] \
[--follow voice-activity|transcript] [--realtime] [--settle-ms N]";

struct Args {
    script: PathBuf,
    replay: Option<PathBuf>,
    follow: Option<FollowStrategy>,
    realtime: bool,
    settle: Duration,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let mut config = load_config(Path::new("conf/config.toml"));
    if let Some(strategy) = args.follow {
        config.follow_strategy = strategy;
    }
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.script.display(),
        level = %config.log_level,
        strategy = %config.follow_strategy,
        "Starting prompter"
    );

    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let replay = match &args.replay {
        Some(path) => Some(Replay::new(load_replay(path)?)),
        None => None,
    };

    let engine = ReplayEngine::default();
    let mut session = PrompterSession::start(&text, config, Box::new(engine.clone()))
        .context("Failed to start the prompter session")?;

    let liveness = session.liveness();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; ending session");
        liveness.end();
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }

    let mut clock: Box<dyn FrameClock> = if args.realtime {
        Box::new(IntervalClock::sixty_hz())
    } else {
        Box::new(SimulatedClock::sixty_hz())
    };

    match replay {
        Some(replay) => drive_replay(&mut session, clock.as_mut(), &engine, replay, args.settle),
        None => drive_autoplay(&mut session, clock.as_mut(), args.settle),
    }

    let snapshot = session.apply_command(SessionCommand::End).snapshot;
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    );
    Ok(())
}

fn drive_replay(
    session: &mut PrompterSession,
    clock: &mut dyn FrameClock,
    engine: &ReplayEngine,
    mut replay: Replay,
    settle: Duration,
) {
    let event = session.apply_command(SessionCommand::StartMic);
    if let Some(err) = event.error {
        warn!("Microphone unavailable; replay skipped: {err}");
        return;
    }

    let stop_at = replay.last_at() + settle;
    let stats = run_frame_loop(session, clock, |session, now| {
        let due = replay.due(now);
        for signal in engine
            .drain()
            .into_iter()
            .chain(due.into_iter().map(|event| event.into_signal()))
        {
            debug!(?signal, "Replaying recognition signal");
            if let Err(err) = session.handle_recognition(signal) {
                warn!("Recognition failed during replay: {err}");
            }
        }
        if replay.is_finished() && now >= stop_at {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    info!(
        frames = stats.frames,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        position = stats.last_state.current,
        matched = session.last_matched_index(),
        engine_running = engine.is_running(),
        restarts = session.recognition().restarts(),
        "Replay finished"
    );
}

fn drive_autoplay(session: &mut PrompterSession, clock: &mut dyn FrameClock, settle: Duration) {
    session.apply_command(SessionCommand::TogglePlay);
    let stats = run_frame_loop(session, clock, |_, now| {
        if now >= settle {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    info!(
        frames = stats.frames,
        position = stats.last_state.current,
        "Autoplay finished"
    );
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let script = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let script = PathBuf::from(script);
    if !script.exists() {
        return Err(anyhow!("File not found: {}", script.display()));
    }

    let mut parsed = Args {
        script,
        replay: None,
        follow: None,
        realtime: false,
        settle: Duration::from_secs(2),
    };
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--replay" => {
                let path = args.next().ok_or_else(|| anyhow!("--replay needs a path"))?;
                parsed.replay = Some(PathBuf::from(path));
            }
            "--follow" => {
                let value = args.next().ok_or_else(|| anyhow!("--follow needs a strategy"))?;
                parsed.follow = Some(value.parse().map_err(|err: String| anyhow!(err))?);
            }
            "--realtime" => parsed.realtime = true,
            "--settle-ms" => {
                let value = args.next().ok_or_else(|| anyhow!("--settle-ms needs a value"))?;
                let ms: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid --settle-ms value {value:?}"))?;
                parsed.settle = Duration::from_millis(ms);
            }
            other => return Err(anyhow!("Unknown argument {other:?}\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
