// Config Module - Configuration management and command-line argument parsing
use anyhow::Result;
use clap::Parser;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::palettes::PaletteId;
use crate::patterns::Pattern;

// Global storage for custom config path
static CUSTOM_CONFIG_PATH: OnceLock<Option<String>> = OnceLock::new();

pub const MODES: [&str; 2] = ["preview", "headless"];

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Procedural animations for an 8x8x8 RGB LED cube",
    long_about = "Renders the LED cube's pattern library in the terminal or headless.\n\
                  Frames can also be streamed in over UDP (1536 bytes of RGB per frame), and the\n\
                  cube firmware's serial pattern-switch messages are honored."
)]
pub struct Args {
    /// Pattern name (e.g. "Rain", "fireworks", "3d_plasma")
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Palette name or custom palette from the config file
    #[arg(short = 'c', long)]
    pub palette: Option<String>,

    /// Target framerate (frames per second)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Global brightness (0.0 to 1.0)
    #[arg(short, long)]
    pub brightness: Option<f64>,

    /// Front-end mode (preview, headless)
    #[arg(long)]
    pub mode: Option<String>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg myconf for ~/.config/ledcube/myconf.conf)
    #[arg(long)]
    pub cfg: Option<String>,

    /// Enable the UDP frame relay
    #[arg(long)]
    pub relay: bool,

    /// UDP port for the frame relay
    #[arg(long)]
    pub relay_port: Option<u16>,

    /// Stop after rendering this many frames (headless mode)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Print the frame at this animation time (ms) as JSON and exit
    #[arg(long)]
    pub snapshot: Option<f64>,

    /// Seed for the fireworks launcher (0 = random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Advance to the next pattern every N seconds (0 = off)
    #[arg(long)]
    pub cycle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,  // Stores the config file path (not serialized)

    pub mode: String,  // Front-end: preview, headless
    pub pattern: String,
    pub palette: String,
    pub fps: f64,
    pub brightness: f64,  // Global brightness multiplier (0.0 to 1.0)
    pub cycle_seconds: f64,  // Auto-advance to the next pattern (0 = off)
    pub seed: u64,  // Fireworks RNG seed (0 = random each run)
    pub relay_enabled: bool,
    pub relay_listen_ip: String,
    pub relay_listen_port: u16,
    pub relay_timeout_ms: u64,  // Fall back to the local simulation after this long without frames
    pub palettes: HashMap<String, String>,  // Custom palettes: name = "RRGGBB,RRGGBB,..."
}

impl Default for CubeConfig {
    fn default() -> Self {
        CubeConfig {
            config_path: None,
            mode: "preview".to_string(),
            pattern: Pattern::SphericalPhyllotaxis.name().to_string(),
            palette: PaletteId::DynamicRainbow.name().to_string(),
            fps: 30.0,
            brightness: 1.0,
            cycle_seconds: 0.0,
            seed: 0,
            relay_enabled: false,
            relay_listen_ip: "127.0.0.1".to_string(),
            relay_listen_port: 1234,
            relay_timeout_ms: 2000,
            palettes: HashMap::new(),
        }
    }
}

impl CubeConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(ref mode) = args.mode {
            self.mode = mode.clone();
            args_provided = true;
        }

        if let Some(ref pattern) = args.pattern {
            self.pattern = pattern.clone();
            args_provided = true;
        }

        if let Some(ref palette) = args.palette {
            self.palette = palette.clone();
            args_provided = true;
        }

        if let Some(fps) = args.fps {
            self.fps = fps;
            args_provided = true;
        }

        if let Some(brightness) = args.brightness {
            self.brightness = brightness;
            args_provided = true;
        }

        if args.relay {
            self.relay_enabled = true;
            args_provided = true;
        }

        if let Some(port) = args.relay_port {
            self.relay_listen_port = port;
            args_provided = true;
        }

        if let Some(seed) = args.seed {
            self.seed = seed;
            args_provided = true;
        }

        if let Some(cycle) = args.cycle {
            self.cycle_seconds = cycle;
            args_provided = true;
        }

        if args_provided {
            self.sanitize();
        }

        args_provided
    }

    /// Set the global config path (called once at startup)
    pub fn set_config_path(cfg: Option<String>) {
        let _ = CUSTOM_CONFIG_PATH.set(cfg);
    }

    /// Get the global config path (if set)
    fn get_config_path_arg() -> Option<&'static str> {
        CUSTOM_CONFIG_PATH.get().and_then(|opt| opt.as_deref())
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        // Priority: explicit arg > global > default
        let cfg = cfg_arg.or_else(|| Self::get_config_path_arg());

        if let Some(cfg) = cfg {
            let path = PathBuf::from(cfg);
            if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Otherwise treat as config name in config directory
            let config_dir = Self::config_dir()?;
            let filename = if cfg.ends_with(".conf") {
                cfg.to_string()
            } else {
                format!("{}.conf", cfg)
            };
            Ok(config_dir.join(filename))
        } else {
            Ok(Self::config_dir()?.join("config.conf"))
        }
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")?;
        let config_dir = PathBuf::from(home).join(".config").join("ledcube");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        let contents = std::fs::read_to_string(&path)?;
        let mut parsed: Self = toml::from_str(&contents)?;
        parsed.config_path = Some(path);
        parsed.sanitize();
        Ok(parsed)
    }

    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.mode = self.mode.trim().to_lowercase();
        if !MODES.contains(&self.mode.as_str()) {
            warn!("Unknown mode '{}', using preview", self.mode);
            self.mode = "preview".to_string();
        }

        self.pattern = self.pattern.trim().to_string();
        self.palette = self.palette.trim().to_string();
        self.relay_listen_ip = self.relay_listen_ip.trim().to_string();
        if self.relay_listen_ip.is_empty() {
            self.relay_listen_ip = "127.0.0.1".to_string();
        }

        // Clamp numeric values to sane ranges
        self.fps = if self.fps.is_finite() { self.fps.clamp(1.0, 240.0) } else { 30.0 };
        self.brightness = if self.brightness.is_finite() { self.brightness.clamp(0.0, 1.0) } else { 1.0 };
        self.cycle_seconds = if self.cycle_seconds.is_finite() { self.cycle_seconds.max(0.0) } else { 0.0 };
        self.relay_timeout_ms = self.relay_timeout_ms.max(100);

        self.palettes = self
            .palettes
            .iter()
            .map(|(name, colors)| (name.trim().to_string(), Self::sanitize_color_string(colors)))
            .filter(|(name, colors)| !name.is_empty() && !colors.is_empty())
            .collect();
    }

    /// Sanitize a comma-separated hex color list (e.g., "FF0000, 00FF00," -> "FF0000,00FF00")
    fn sanitize_color_string(color: &str) -> String {
        color
            .split(',')
            .map(|s| s.trim().trim_start_matches('#'))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Frame interval derived from the configured framerate
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.fps.max(1.0)
    }

    /// True if switching from `self` to `other` needs the front-end to restart
    pub fn needs_restart(&self, other: &CubeConfig) -> bool {
        self.mode != other.mode
            || self.relay_enabled != other.relay_enabled
            || self.relay_listen_ip != other.relay_listen_ip
            || self.relay_listen_port != other.relay_listen_port
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Self::config_path(None)?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Sanitize values before saving
        let mut sanitized = self.clone();
        sanitized.sanitize();

        // Build TOML with comments manually for better documentation
        let mut contents = format!(
            r#"# LED Cube Configuration File
# Edit this file while the program is running to change settings in real-time

# Front-end mode: preview (terminal), headless
mode = {}

# Pattern: {}
pattern = {}

# Palette: one of the built-ins below or a name from [palettes]
# {}
palette = {}

# Target framerate (frames per second)
fps = {:?}

# Global brightness multiplier (0.0 to 1.0)
brightness = {:?}

# Advance to the next pattern every N seconds (0 = off)
cycle_seconds = {:?}

# Fireworks RNG seed (0 = random each run)
seed = {}

# UDP frame relay: 1536-byte datagrams replace the local animation,
# text datagrams are read as serial console output
relay_enabled = {}
relay_listen_ip = {}
relay_listen_port = {}

# Return to the local animation after this long without relay frames
relay_timeout_ms = {}

# Custom palettes: name = "RRGGBB,RRGGBB,..." (at least two colors)
[palettes]
"#,
            quoted(&sanitized.mode),
            crate::patterns::get_pattern_names().join(", "),
            quoted(&sanitized.pattern),
            crate::palettes::get_palette_names().join(", "),
            quoted(&sanitized.palette),
            sanitized.fps,
            sanitized.brightness,
            sanitized.cycle_seconds,
            sanitized.seed,
            sanitized.relay_enabled,
            quoted(&sanitized.relay_listen_ip),
            sanitized.relay_listen_port,
            sanitized.relay_timeout_ms,
        );

        if !sanitized.palettes.is_empty() {
            contents.push_str(&toml::to_string(&sanitized.palettes)?);
        }

        std::fs::write(&path, contents)?;
        Ok(())
    }
}

fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config(dir: &TempDir) -> PathBuf {
        dir.path().join("cube.conf")
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = temp_config(&dir);

        let mut config = CubeConfig::default();
        config.config_path = Some(path.clone());
        config.pattern = "Rain".to_string();
        config.palette = "Ember Glow".to_string();
        config.fps = 24.0;
        config.brightness = 0.85;
        config.relay_enabled = true;
        config.palettes.insert("Ember Glow".to_string(), "FF4500,330000".to_string());
        config.save().unwrap();

        let loaded = CubeConfig::load_with_path(path.to_str()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = temp_config(&dir);
        std::fs::write(&path, "pattern = \"Fireworks\"\n").unwrap();

        let loaded = CubeConfig::load_with_path(path.to_str()).unwrap();
        assert_eq!(loaded.pattern, "Fireworks");
        assert_eq!(loaded.palette, "Dynamic Rainbow");
        assert_eq!(loaded.fps, 30.0);
        assert!(loaded.palettes.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = temp_config(&dir);
        std::fs::write(&path, "fps = \"fast\"\n").unwrap();
        assert!(CubeConfig::load_with_path(path.to_str()).is_err());
    }

    #[test]
    fn test_sanitize_clamps_and_trims() {
        let mut config = CubeConfig {
            mode: " HEADLESS ".to_string(),
            pattern: "  Rain ".to_string(),
            fps: 0.0,
            brightness: 3.0,
            cycle_seconds: -5.0,
            relay_listen_ip: "  ".to_string(),
            relay_timeout_ms: 0,
            ..CubeConfig::default()
        };
        config.palettes.insert(" Ember ".to_string(), "#ff4500, 330000,".to_string());
        config.palettes.insert("Empty".to_string(), " , ".to_string());
        config.sanitize();

        assert_eq!(config.mode, "headless");
        assert_eq!(config.pattern, "Rain");
        assert_eq!(config.fps, 1.0);
        assert_eq!(config.brightness, 1.0);
        assert_eq!(config.cycle_seconds, 0.0);
        assert_eq!(config.relay_listen_ip, "127.0.0.1");
        assert_eq!(config.relay_timeout_ms, 100);
        assert_eq!(config.palettes.get("Ember").map(String::as_str), Some("FF4500,330000"));
        assert!(!config.palettes.contains_key("Empty"));

        config.mode = "vr".to_string();
        config.fps = f64::NAN;
        config.sanitize();
        assert_eq!(config.mode, "preview");
        assert_eq!(config.fps, 30.0);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = CubeConfig::default();
        assert!(!config.merge_with_args(&Args::default()));
        assert_eq!(config, CubeConfig::default());

        let args = Args {
            pattern: Some("Fireworks".to_string()),
            brightness: Some(0.5),
            relay: true,
            relay_port: Some(9000),
            cycle: Some(12.0),
            // Run-only options are never persisted
            frames: Some(10),
            snapshot: Some(250.0),
            ..Args::default()
        };
        assert!(config.merge_with_args(&args));
        assert_eq!(config.pattern, "Fireworks");
        assert_eq!(config.brightness, 0.5);
        assert!(config.relay_enabled);
        assert_eq!(config.relay_listen_port, 9000);
        assert_eq!(config.cycle_seconds, 12.0);
    }

    #[test]
    fn test_config_path_resolution() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("abs.conf");
        assert_eq!(CubeConfig::config_path(absolute.to_str()).unwrap(), absolute);
        assert_eq!(
            CubeConfig::config_path(Some("configs/cube.conf")).unwrap(),
            PathBuf::from("configs/cube.conf")
        );
    }

    #[test]
    fn test_needs_restart() {
        let config = CubeConfig::default();
        let mut other = config.clone();
        other.brightness = 0.2;
        other.pattern = "Rain".to_string();
        assert!(!config.needs_restart(&other));
        other.relay_listen_port = 5000;
        assert!(config.needs_restart(&other));
    }
}
