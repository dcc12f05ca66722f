// Frame Module - Full-cube color buffer in LED strip order
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cube::{in_bounds, xyz_to_index, NUM_LEDS};
use crate::types::Rgb;

/// Channel value above which an LED counts as lit in the stats
const ACTIVE_THRESHOLD: u8 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// One color per LED, indexed by strip position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    leds: Vec<Rgb>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// All LEDs off
    pub fn new() -> Self {
        Frame { leds: vec![Rgb::BLACK; NUM_LEDS] }
    }

    /// Decode a raw RGB byte stream (R,G,B triples in strip order).
    /// Anything other than exactly one full cube is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let expected = NUM_LEDS * 3;
        if bytes.len() != expected {
            return Err(FrameError::Length { expected, actual: bytes.len() });
        }

        let leds = bytes
            .chunks_exact(3)
            .map(|px| Rgb::new(px[0], px[1], px[2]))
            .collect();
        Ok(Frame { leds })
    }

    pub fn leds(&self) -> &[Rgb] {
        &self.leds
    }

    pub fn get(&self, index: usize) -> Rgb {
        self.leds.get(index).copied().unwrap_or(Rgb::BLACK)
    }

    pub fn get_xyz(&self, x: i32, y: i32, z: i32) -> Rgb {
        if !in_bounds(x, y, z) {
            return Rgb::BLACK;
        }
        self.leds[xyz_to_index(x, y, z)]
    }

    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(led) = self.leds.get_mut(index) {
            *led = color;
        }
    }

    /// Set by lattice coordinate; writes outside the cube are dropped
    pub fn set_xyz(&mut self, x: i32, y: i32, z: i32, color: Rgb) {
        if in_bounds(x, y, z) {
            self.leds[xyz_to_index(x, y, z)] = color;
        }
    }

    /// Brightest wins: replace the LED only if the candidate is brighter than what is there.
    /// Returns true if the candidate was written.
    pub fn blend_max(&mut self, index: usize, candidate: Rgb) -> bool {
        match self.leds.get_mut(index) {
            Some(led) if candidate.luminance() > led.luminance() => {
                *led = candidate;
                true
            }
            _ => false,
        }
    }

    pub fn blend_max_xyz(&mut self, x: i32, y: i32, z: i32, candidate: Rgb) -> bool {
        if !in_bounds(x, y, z) {
            return false;
        }
        self.blend_max(xyz_to_index(x, y, z), candidate)
    }

    /// Number of LEDs visibly lit
    pub fn active_leds(&self) -> usize {
        self.leds
            .iter()
            .filter(|led| led.r > ACTIVE_THRESHOLD || led.g > ACTIVE_THRESHOLD || led.b > ACTIVE_THRESHOLD)
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.leds.iter().all(|led| led.is_black())
    }

    /// Apply a global brightness multiplier (0.0 to 1.0) to every LED
    pub fn dim(&mut self, brightness: f64) {
        let brightness = brightness.clamp(0.0, 1.0);
        if brightness >= 1.0 {
            return;
        }
        for led in self.leds.iter_mut() {
            *led = led.scale(brightness);
        }
    }
}
