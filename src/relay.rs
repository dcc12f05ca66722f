// Relay Module - UDP frame ingest and serial pattern-switch monitoring
//
// A datagram of exactly one cube frame (512 RGB triples) is shown instead of the local
// animation. Any other UTF-8 datagram is treated as a chunk of the firmware's serial
// console output, where the firmware announces pattern switches.
use anyhow::Result;
use log::{debug, info, warn};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::CubeConfig;
use crate::cube::NUM_LEDS;
use crate::frame::Frame;
use crate::patterns::Pattern;
use crate::simulation::Simulation;

/// Line prefixes the firmware prints before the new pattern number
const SWITCH_MARKERS: [&str; 2] = ["Mudando para padrão:", "Switching to pattern:"];

/// Unterminated serial text is dropped past this size
const MAX_PENDING_TEXT: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Frame(Frame),
    PatternSwitch(Pattern),
}

/// Reassembles serial console text and reports pattern switches
#[derive(Debug, Default)]
pub struct SerialMonitor {
    buffer: String,
}

impl SerialMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of console text. Only complete lines are examined; a trailing
    /// partial line waits for the next chunk. Returns the pattern from the last
    /// complete switch line, if any.
    pub fn push(&mut self, chunk: &str) -> Option<Pattern> {
        self.buffer.push_str(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            if self.buffer.len() > MAX_PENDING_TEXT {
                warn!("Dropping {} bytes of unterminated serial text", self.buffer.len());
                self.buffer.clear();
            }
            return None;
        };

        let complete: String = self.buffer.drain(..=last_newline).collect();
        complete.lines().filter_map(parse_switch_line).last()
    }

    /// Text still waiting for its newline
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Extract the pattern from a line like "Mudando para padrão: 3"
pub fn parse_switch_line(line: &str) -> Option<Pattern> {
    SWITCH_MARKERS.iter().find_map(|marker| {
        let start = line.find(marker)? + marker.len();
        let digits: String = line[start..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let index = digits.parse::<usize>().ok()?;
        let pattern = Pattern::get(index);
        if pattern.is_none() {
            debug!("Ignoring switch to unknown pattern index {}", index);
        }
        pattern
    })
}

/// Turn one datagram into an event. Malformed datagrams are logged and dropped.
pub fn handle_datagram(bytes: &[u8], monitor: &mut SerialMonitor) -> Option<RelayEvent> {
    if bytes.len() == NUM_LEDS * 3 {
        return match Frame::from_bytes(bytes) {
            Ok(frame) => Some(RelayEvent::Frame(frame)),
            Err(e) => {
                warn!("Dropping relay frame: {}", e);
                None
            }
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => monitor.push(text).map(RelayEvent::PatternSwitch),
        Err(_) => {
            warn!(
                "Dropping {} byte datagram: not a {} byte frame and not text",
                bytes.len(),
                NUM_LEDS * 3
            );
            None
        }
    }
}

/// Background UDP listener feeding relay events over a channel
pub struct RelayListener {
    rx: mpsc::Receiver<RelayEvent>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl RelayListener {
    pub fn spawn(listen_ip: &str, listen_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(format!("{}:{}", listen_ip, listen_port))?;
        socket.set_read_timeout(Some(Duration::from_millis(50)))?;  // Short timeout so shutdown is noticed
        let local_addr = socket.local_addr()?;

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let handle = std::thread::spawn(move || {
            let mut packet_buf = [0u8; 65535];  // Max UDP packet size
            let mut monitor = SerialMonitor::new();

            while !shutdown_flag.load(Ordering::Relaxed) {
                match socket.recv_from(&mut packet_buf) {
                    Ok((size, src)) => {
                        if let Some(event) = handle_datagram(&packet_buf[..size], &mut monitor) {
                            if let RelayEvent::PatternSwitch(pattern) = &event {
                                debug!("{} announced pattern {}", src, pattern.name());
                            }
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {}
                    Err(e) => warn!("UDP recv error: {}", e),
                }
            }
        });

        info!("Relay listening on udp://{}", local_addr);
        Ok(RelayListener {
            rx,
            shutdown,
            handle: Some(handle),
            local_addr,
        })
    }

    pub fn try_recv(&self) -> Option<RelayEvent> {
        self.rx.try_recv().ok()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Chooses between relayed frames and the local simulation
pub struct FrameSource {
    listener: Option<RelayListener>,
    external: Option<(Instant, Frame)>,
    timeout: Duration,
    external_frames: u64,
}

impl FrameSource {
    pub fn new(listener: Option<RelayListener>, timeout_ms: u64) -> Self {
        FrameSource {
            listener,
            external: None,
            timeout: Duration::from_millis(timeout_ms),
            external_frames: 0,
        }
    }

    /// Start the UDP listener if the relay is enabled
    pub fn from_config(config: &CubeConfig) -> Result<Self> {
        let listener = if config.relay_enabled {
            Some(RelayListener::spawn(&config.relay_listen_ip, config.relay_listen_port)?)
        } else {
            None
        };
        Ok(Self::new(listener, config.relay_timeout_ms))
    }

    /// Drain pending relay events, applying pattern switches to the simulation
    pub fn poll(&mut self, sim: &mut Simulation) {
        let now = Instant::now();
        while let Some(event) = self.listener.as_ref().and_then(|l| l.try_recv()) {
            self.accept(event, now, sim);
        }
    }

    pub fn accept(&mut self, event: RelayEvent, now: Instant, sim: &mut Simulation) {
        match event {
            RelayEvent::Frame(frame) => {
                if self.external.is_none() {
                    info!("Relay stream active, showing external frames");
                }
                self.external = Some((now, frame));
                self.external_frames += 1;
            }
            RelayEvent::PatternSwitch(pattern) => {
                info!("Firmware switched to pattern {}: {}", pattern as usize, pattern.name());
                sim.set_pattern(pattern);
            }
        }
    }

    /// The latest relayed frame, unless the stream has gone quiet
    pub fn external_frame(&mut self, now: Instant) -> Option<&Frame> {
        let expired = self
            .external
            .as_ref()
            .is_some_and(|(received, _)| now.saturating_duration_since(*received) >= self.timeout);
        if expired {
            info!("Relay stream timed out, resuming local animation");
            self.external = None;
        }
        self.external.as_ref().map(|(_, frame)| frame)
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.local_addr())
    }

    pub fn external_frames(&self) -> u64 {
        self.external_frames
    }
}
