// Shared types module - Common types used across multiple modules

use anyhow::Result;
use serde::{Deserialize, Serialize};

// Mode exit reason - used to determine if we should quit or switch modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeExitReason {
    UserQuit,      // User pressed 'q' or Ctrl+C - should exit app
    ModeChanged,   // Mode changed in config - should switch modes
}

// RGB color representation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Build a color from float channels, rounding and clamping each into 0..=255
    pub fn from_f64(r: f64, g: f64, b: f64) -> Self {
        Rgb {
            r: r.round().clamp(0.0, 255.0) as u8,
            g: g.round().clamp(0.0, 255.0) as u8,
            b: b.round().clamp(0.0, 255.0) as u8,
        }
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }

    /// Parse a comma-separated list of hex colors ("FF0000,00FF00,...")
    pub fn parse_list(color_str: &str) -> Result<Vec<Self>> {
        color_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Rgb::from_hex)
            .collect()
    }

    /// Mean channel value normalized to 0.0-1.0
    pub fn luminance(&self) -> f64 {
        (self.r as f64 + self.g as f64 + self.b as f64) / 3.0 / 255.0
    }

    /// Multiply every channel by `factor`, clamping the result
    pub fn scale(&self, factor: f64) -> Self {
        Rgb::from_f64(
            self.r as f64 * factor,
            self.g as f64 * factor,
            self.b as f64 * factor,
        )
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}
