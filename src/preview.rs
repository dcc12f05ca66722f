// Preview Module - Terminal preview of the cube as eight z-layer slices
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::ops::Range;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::CubeConfig;
use crate::cube::{CUBE_SIZE, NUM_LEDS};
use crate::frame::Frame;
use crate::relay::FrameSource;
use crate::simulation::Simulation;
use crate::types::{ModeExitReason, Rgb};

const N: i32 = CUBE_SIZE as i32;
const LAYERS_PER_ROW: i32 = 4;
const BRIGHTNESS_STEP: f64 = 0.1;

type CubeTerminal = Terminal<CrosstermBackend<Stdout>>;

fn restore_terminal(terminal: &mut CubeTerminal) -> Result<()> {
    terminal.show_cursor()?;
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Draw a run of z-layers side by side, top row (y = N-1) first
pub fn layer_lines(frame: &Frame, layers: Range<i32>) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(CUBE_SIZE + 1);

    let header: Vec<Span> = layers
        .clone()
        .map(|z| Span::styled(format!("{:<18}", format!("z={}", z)), Style::default().fg(Color::Cyan)))
        .collect();
    lines.push(Line::from(header));

    for y in (0..N).rev() {
        let mut spans = Vec::new();
        for z in layers.clone() {
            for x in 0..N {
                spans.push(led_span(frame.get_xyz(x, y, z)));
            }
            spans.push(Span::raw("  "));
        }
        lines.push(Line::from(spans));
    }

    lines
}

fn led_span(color: Rgb) -> Span<'static> {
    if color.is_black() {
        Span::styled("··", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled("██", Style::default().fg(Color::Rgb(color.r, color.g, color.b)))
    }
}

/// Run the terminal preview until the user quits or a restart is needed
pub fn run_preview_mode(config: &CubeConfig, config_change_tx: broadcast::Sender<()>) -> Result<ModeExitReason> {
    let mut sim = Simulation::from_config(config);
    let mut frame_source = FrameSource::from_config(config)?;

    // Setup terminal for TUI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    // Subscribe to config changes
    let mut config_change_rx = config_change_tx.subscribe();
    let mut current_config = config.clone();

    // Frame timing
    let mut frame_duration = Duration::from_secs_f64(1.0 / current_config.fps);
    let mut last_frame = Instant::now();
    let mut frame_count = 0u64;
    let mut fps_timer = Instant::now();
    let mut actual_fps = 0.0;

    let mut anim_time_ms = 0.0;
    let mut paused = false;
    let mut dirty = true;
    let mut local_frame = Frame::new();

    loop {
        let loop_start = Instant::now();

        // Check for keyboard input
        if poll(Duration::from_millis(0))? {
            if let Event::Key(key) = read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => {
                        restore_terminal(&mut terminal)?;
                        return Ok(ModeExitReason::UserQuit);
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        restore_terminal(&mut terminal)?;
                        return Ok(ModeExitReason::UserQuit);
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') => {
                        sim.next_pattern();
                        dirty = true;
                    }
                    KeyCode::Char('p') | KeyCode::Char('P') => {
                        sim.next_palette();
                        dirty = true;
                    }
                    KeyCode::Char(' ') => paused = !paused,
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        sim.set_brightness(sim.brightness() + BRIGHTNESS_STEP);
                        dirty = true;
                    }
                    KeyCode::Char('-') | KeyCode::Char('_') => {
                        sim.set_brightness(sim.brightness() - BRIGHTNESS_STEP);
                        dirty = true;
                    }
                    _ => {}
                }
            }
        }

        // Check for config changes
        if let Ok(()) = config_change_rx.try_recv() {
            if let Ok(new_config) = CubeConfig::load() {
                if current_config.needs_restart(&new_config) {
                    restore_terminal(&mut terminal)?;
                    return Ok(ModeExitReason::ModeChanged);
                }

                info!("Config reloaded");
                sim.apply_config(&new_config);
                frame_duration = Duration::from_secs_f64(1.0 / new_config.fps);
                dirty = true;
                current_config = new_config;
            }
        }

        frame_source.poll(&mut sim);

        // Render frame if it's time
        let elapsed = loop_start.duration_since(last_frame);
        if elapsed >= frame_duration {
            last_frame = loop_start;

            if !paused {
                anim_time_ms += elapsed.as_secs_f64() * 1000.0;
            }
            // A paused stateful pattern must not be stepped again
            if !paused || (dirty && !sim.pattern().is_stateful()) {
                local_frame = sim.tick(anim_time_ms);
            }
            dirty = false;

            let (shown, source) = match frame_source.external_frame(loop_start) {
                Some(external) => (external.clone(), "Relay"),
                None => (local_frame.clone(), "Local"),
            };

            frame_count += 1;
            if fps_timer.elapsed() >= Duration::from_secs(1) {
                actual_fps = frame_count as f64 / fps_timer.elapsed().as_secs_f64();
                frame_count = 0;
                fps_timer = Instant::now();
            }

            let pattern = sim.pattern();
            let mut stats = format!(
                "FPS: {:.1} | Active LEDs: {}/{} | Pattern: {} ({}) | Palette: {} | Brightness: {:.0}% | Source: {}",
                actual_fps,
                shown.active_leds(),
                NUM_LEDS,
                pattern.name(),
                pattern as usize,
                sim.palette_name(),
                sim.brightness() * 100.0,
                source,
            );
            if pattern.is_stateful() {
                stats.push_str(&format!(" | Particles: {}", sim.particle_count()));
            }
            if let Some(addr) = frame_source.listen_addr() {
                stats.push_str(&format!(" | UDP: {} ({} frames)", addr, frame_source.external_frames()));
            }

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3),  // Header
                        Constraint::Min(20),    // Cube slices
                        Constraint::Length(3),  // Stats
                    ])
                    .split(f.size());

                let header_spans = vec![
                    Span::styled("LED Cube", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    Span::raw(" | "),
                    Span::styled(pattern.name(), Style::default().fg(Color::Yellow)),
                    Span::raw(if paused { " | PAUSED" } else { "" }),
                    Span::raw("    "),
                    Span::styled(
                        "n: pattern  p: palette  space: pause  +/-: brightness  q: quit",
                        Style::default().fg(Color::DarkGray),
                    ),
                ];
                let header = Paragraph::new(Line::from(header_spans))
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(header, chunks[0]);

                let mut slice_lines = layer_lines(&shown, 0..LAYERS_PER_ROW);
                slice_lines.push(Line::from(""));
                slice_lines.extend(layer_lines(&shown, LAYERS_PER_ROW..N));
                let slices = Paragraph::new(slice_lines)
                    .block(Block::default().borders(Borders::ALL).title("Layers (x right, y up)"));
                f.render_widget(slices, chunks[1]);

                let footer = Paragraph::new(stats.clone())
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(footer, chunks[2]);
            })?;
        }

        // Small sleep to avoid spinning
        std::thread::sleep(Duration::from_millis(1));
    }
}
