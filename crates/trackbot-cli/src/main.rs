//! `trackbot` – runs the tracking-and-arbitration core against simulated
//! hardware.
//!
//! 1. Loads `~/.trackbot/config.toml` (or `--config <path>`), writing the
//!    defaults on first run.
//! 2. Starts the capture thread and the scripted face/gesture detectors.
//! 3. Runs the control loop on the main thread while an interactive console
//!    feeds it remote keys, gestures, faces and distance readings.
//! 4. On Ctrl-C or `quit`, stops the robot, turns the lights off and prints
//!    the loop metrics.

mod config;
mod console;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use tracing::{info, warn};

use trackbot_hal::sim::{SimCamera, SimHardware};
use trackbot_perception::{DetectorFamily, FrameBus, ScriptedDetector};
use trackbot_runtime::{CaptureSettings, CaptureWorker, ControlLoop, init_tracing};

use crate::config::Config;
use crate::console::Console;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); TRACKBOT_LOG_FORMAT=json switches to
    // newline-delimited JSON.
    init_tracing();

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let path = match parse_args(std::env::args().skip(1)) {
        Ok(path) => path.unwrap_or_else(config::config_path),
        Err(e) => {
            eprintln!("{}: {}", "Usage error".red(), e);
            eprintln!("  usage: trackbot [--config <path>]");
            std::process::exit(2);
        }
    };
    let cfg = load_config(&path);

    // ── Hardware and perception ───────────────────────────────────────────
    let (hardware, probe) = SimHardware::new()
        .with_distance_sensor()
        .with_lights()
        .build();
    let frames = Arc::new(FrameBus::new());

    let camera = SimCamera::new("sim-cam", cfg.camera.width, cfg.camera.height);
    let capture = match CaptureWorker::spawn(
        Box::new(camera),
        Arc::clone(&frames),
        CaptureSettings::for_fps(cfg.camera.fps),
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "camera unavailable; detection modes will idle");
            None
        }
    };

    let mut control = match ControlLoop::new(cfg.control.clone(), Arc::clone(&frames), hardware) {
        Ok(control) => control,
        Err(e) => {
            eprintln!("{}: {}", "Startup error".red(), e);
            std::process::exit(1);
        }
    };
    let (face_detector, faces) = ScriptedDetector::new(DetectorFamily::Face);
    let (hand_detector, hands) = ScriptedDetector::new(DetectorFamily::Gesture);
    control.register_detector(Box::new(face_detector));
    control.register_detector(Box::new(hand_detector));

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Console ───────────────────────────────────────────────────────────
    let (events, inputs) = mpsc::channel();
    let console = Console {
        events,
        faces,
        hands,
        probe,
        shutdown: Arc::clone(&shutdown),
        frame_size: (cfg.camera.width, cfg.camera.height),
    };
    println!("  Type {} for a list of commands.\n", "help".bold().cyan());
    if let Err(e) = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || console.run())
    {
        warn!(error = %e, "failed to start console; running headless until Ctrl-C");
    }

    // ── Control loop ──────────────────────────────────────────────────────
    control.run(&inputs, &shutdown);

    if let Some(capture) = capture {
        let stats = capture.stop();
        info!(
            frames = stats.frames,
            dropped = stats.dropped,
            reconnects = stats.reconnects,
            "capture stopped"
        );
    }

    match serde_json::to_string_pretty(&control.metrics_snapshot()) {
        Ok(json) => println!("\n{}\n{}", "Loop metrics".bold().underline(), json),
        Err(e) => warn!(error = %e, "failed to serialize metrics"),
    }
    println!("{}", "  ✓ Robot stopped. Exiting trackbot.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// `--config <path>` is the only option.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>, String> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().ok_or("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    Ok(path)
}

fn load_config(path: &std::path::Path) -> Config {
    let cfg = match config::load_from(path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save_to(&Config::default(), path) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            Config::default()
        }
    };

    if let Err(e) = cfg.control.validate() {
        warn!(error = %e, "invalid control configuration; using defaults");
        return Config {
            camera: cfg.camera,
            ..Config::default()
        };
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  _                  _    _           _   "#.bold().cyan());
    println!("{}", r#" | |_ _ __ __ _  ___| | _| |__   ___ | |_ "#.bold().cyan());
    println!("{}", r#" | __| '__/ _` |/ __| |/ / '_ \ / _ \| __|"#.bold().cyan());
    println!("{}", r#" | |_| | | (_| | (__|   <| |_) | (_) | |_ "#.bold().cyan());
    println!("{}", r#"  \__|_|  \__,_|\___|_|\_\_.__/ \___/ \__|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "trackbot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Tracking and mode-arbitration control core (simulated hardware)");
    println!();
}
