// LedCube - Procedural animation engine for an 8x8x8 RGB LED cube
// Renders the pattern library in a terminal preview or headless, with an optional UDP relay
use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use notify::{Config, Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use ledcube::config::{Args, CubeConfig};
use ledcube::cube::NUM_LEDS;
use ledcube::frame::Frame;
use ledcube::preview;
use ledcube::relay::FrameSource;
use ledcube::simulation::Simulation;
use ledcube::types::ModeExitReason;

#[derive(Serialize)]
struct Snapshot<'a> {
    pattern: &'a str,
    palette: &'a str,
    time_ms: f64,
    active_leds: usize,
    frame: &'a Frame,
}

/// Watch config file and notify the running mode when it changes
fn spawn_config_watcher(config_change_tx: broadcast::Sender<()>) -> Result<()> {
    let config_path = CubeConfig::config_path(None)?;

    std::thread::spawn(move || -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                warn!("Config watcher unavailable: {}", e);
                return Ok(());
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            warn!("Could not watch {}: {}", config_path.display(), e);
            return Ok(());
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_)) {
                        let _ = config_change_tx.send(());
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
        Ok(())
    });

    Ok(())
}

/// Print one frame as JSON and exit
fn run_snapshot(config: &CubeConfig, time_ms: f64) -> Result<()> {
    let mut sim = Simulation::from_config(config);
    let frame = sim.render_at(time_ms, config.frame_interval_ms());

    let snapshot = Snapshot {
        pattern: sim.pattern().name(),
        palette: sim.palette_name(),
        time_ms,
        active_leds: frame.active_leds(),
        frame: &frame,
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Run the tick loop without a terminal UI, logging stats once per second
fn run_headless_mode(
    config: &CubeConfig,
    max_frames: Option<u64>,
    running: Arc<AtomicBool>,
    config_change_tx: broadcast::Sender<()>,
) -> Result<ModeExitReason> {
    let mut sim = Simulation::from_config(config);
    let mut frame_source = FrameSource::from_config(config)?;

    let mut config_change_rx = config_change_tx.subscribe();
    let mut current_config = config.clone();

    let mut frame_duration = Duration::from_secs_f64(1.0 / current_config.fps);
    let start = Instant::now();
    let mut next_frame = start;
    let mut total_frames = 0u64;
    let mut frame_count = 0u64;
    let mut stats_timer = Instant::now();

    info!(
        "Headless mode: {} / {} at {:.0} fps",
        sim.pattern().name(),
        sim.palette_name(),
        current_config.fps
    );

    loop {
        if !running.load(Ordering::Relaxed) {
            return Ok(ModeExitReason::UserQuit);
        }

        // Check for config changes
        if let Ok(()) = config_change_rx.try_recv() {
            match CubeConfig::load() {
                Ok(new_config) => {
                    if current_config.needs_restart(&new_config) {
                        return Ok(ModeExitReason::ModeChanged);
                    }
                    info!("Config reloaded: {} / {}", new_config.pattern, new_config.palette);
                    sim.apply_config(&new_config);
                    frame_duration = Duration::from_secs_f64(1.0 / new_config.fps);
                    current_config = new_config;
                }
                Err(e) => warn!("Ignoring config change: {}", e),
            }
        }

        frame_source.poll(&mut sim);

        let now = Instant::now();
        if now < next_frame {
            std::thread::sleep((next_frame - now).min(Duration::from_millis(5)));
            continue;
        }
        next_frame += frame_duration;
        if next_frame < now {
            // Fell behind; don't try to catch up
            next_frame = now + frame_duration;
        }

        let local = sim.tick(now.duration_since(start).as_secs_f64() * 1000.0);
        let (active, source) = match frame_source.external_frame(now) {
            Some(external) => (external.active_leds(), "relay"),
            None => (local.active_leds(), "local"),
        };

        total_frames += 1;
        frame_count += 1;

        if stats_timer.elapsed() >= Duration::from_secs(1) {
            let fps = frame_count as f64 / stats_timer.elapsed().as_secs_f64();
            info!(
                "FPS: {:.1} | Active LEDs: {}/{} | Pattern: {} | Palette: {} | Source: {} | Particles: {}",
                fps,
                active,
                NUM_LEDS,
                sim.pattern().name(),
                sim.palette_name(),
                source,
                sim.particle_count()
            );
            frame_count = 0;
            stats_timer = Instant::now();
        }

        if max_frames.is_some_and(|max| total_frames >= max) {
            info!("Rendered {} frames, stopping", total_frames);
            return Ok(ModeExitReason::UserQuit);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set global config path immediately (before any config loads)
    CubeConfig::set_config_path(args.cfg.clone());

    let cfg_arg = args.cfg.as_deref();
    let config_path = CubeConfig::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    // Load existing config or create default, then merge with command line args
    let mut config = if config_file_exists {
        match CubeConfig::load_with_path(cfg_arg) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config file {}: {}", config_path.display(), e);
                eprintln!("Please fix the config file or delete it to regenerate with defaults.");
                return Err(e);
            }
        }
    } else {
        CubeConfig {
            config_path: Some(config_path.clone()),
            ..CubeConfig::default()
        }
    };

    let args_provided = config.merge_with_args(&args);

    // The terminal belongs to the preview UI, so it logs nothing unless asked to
    let default_filter = if config.mode == "preview" && args.snapshot.is_none() { "off" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Some(time_ms) = args.snapshot {
        return run_snapshot(&config, time_ms);
    }

    // Save config only on first run or when CLI args changed it
    if !config_file_exists || args_provided {
        config.save()?;
    }
    info!("Using config file: {}", config_path.display());

    let (config_change_tx, _config_change_rx) = broadcast::channel(16);
    spawn_config_watcher(config_change_tx.clone())?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    // Main mode switching loop - allows dynamic mode changes without restart
    loop {
        let current_config = CubeConfig::load().unwrap_or_else(|_| config.clone());

        let result = match current_config.mode.as_str() {
            "headless" => run_headless_mode(&current_config, args.frames, running.clone(), config_change_tx.clone()),
            _ => preview::run_preview_mode(&current_config, config_change_tx.clone()),
        };

        match result {
            Ok(ModeExitReason::UserQuit) => return Ok(()),
            Ok(ModeExitReason::ModeChanged) => {
                info!("Configuration changed, restarting in {} mode", CubeConfig::load().map(|c| c.mode).unwrap_or_default());
            }
            Err(e) => {
                error!("{} mode error: {}", current_config.mode, e);
                return Err(e);
            }
        }
    }
}
