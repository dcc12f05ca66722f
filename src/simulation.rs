// Simulation Module - Drives the active pattern frame by frame
//
// Owns everything that must survive between frames: the active pattern and palette,
// the fireworks context, and the auto-cycle timer. Parameter changes apply on the
// next tick.
use log::{debug, warn};
use std::collections::HashMap;

use crate::config::CubeConfig;
use crate::fireworks::FireworksState;
use crate::frame::Frame;
use crate::palettes::{Palette, PaletteId};
use crate::patterns::Pattern;

/// Stateful patterns are warmed up over at most this much time before a snapshot
const WARM_UP_MS: f64 = 30_000.0;

pub struct Simulation {
    pattern: Pattern,
    palette_name: String,
    palette: Palette,
    custom_palettes: HashMap<String, String>,
    fireworks: FireworksState,
    brightness: f64,
    cycle_seconds: f64,
    cycle_started_ms: Option<f64>,
}

impl Simulation {
    pub fn new(pattern: Pattern, palette_name: &str, fireworks: FireworksState) -> Self {
        Simulation {
            pattern,
            palette_name: palette_name.trim().to_string(),
            palette: Palette::builtin(palette_name),
            custom_palettes: HashMap::new(),
            fireworks,
            brightness: 1.0,
            cycle_seconds: 0.0,
            cycle_started_ms: None,
        }
    }

    pub fn from_config(config: &CubeConfig) -> Self {
        let fireworks = if config.seed == 0 {
            FireworksState::new()
        } else {
            FireworksState::with_seed(config.seed)
        };
        let pattern = Pattern::from_string(&config.pattern).unwrap_or_else(|| {
            warn!("Unknown pattern '{}', starting with {}", config.pattern, Pattern::SphericalPhyllotaxis.name());
            Pattern::SphericalPhyllotaxis
        });

        let mut sim = Simulation::new(pattern, &config.palette, fireworks);
        sim.apply_config(config);
        sim
    }

    /// Pick up pattern, palette, brightness and cycle changes from a reloaded config
    pub fn apply_config(&mut self, config: &CubeConfig) {
        match Pattern::from_string(&config.pattern) {
            Some(pattern) => self.set_pattern(pattern),
            None => warn!("Unknown pattern '{}', keeping {}", config.pattern, self.pattern.name()),
        }
        self.custom_palettes = config.palettes.clone();
        self.set_palette(&config.palette);
        self.set_brightness(config.brightness);
        self.cycle_seconds = config.cycle_seconds.max(0.0);
    }

    /// Render the frame for animation time `time_ms`
    pub fn tick(&mut self, time_ms: f64) -> Frame {
        self.advance_cycle(time_ms);

        let mut frame = self.pattern.render(time_ms, &self.palette, &mut self.fireworks);
        frame.dim(self.brightness);
        frame
    }

    /// Render a single frame at `time_ms`. Stateful patterns are first stepped at
    /// `step_ms` intervals over the preceding `WARM_UP_MS` (from t=0 for early times)
    /// so their state looks like a live run.
    pub fn render_at(&mut self, time_ms: f64, step_ms: f64) -> Frame {
        let time_ms = time_ms.max(0.0);
        if self.pattern.is_stateful() && step_ms > 0.0 {
            self.fireworks.reset();
            let mut t = (time_ms - WARM_UP_MS).max(0.0);
            while t < time_ms {
                self.pattern.render(t, &self.palette, &mut self.fireworks);
                t += step_ms;
            }
        }
        let mut frame = self.pattern.render(time_ms, &self.palette, &mut self.fireworks);
        frame.dim(self.brightness);
        frame
    }

    fn advance_cycle(&mut self, time_ms: f64) {
        if self.cycle_seconds <= 0.0 {
            self.cycle_started_ms = None;
            return;
        }

        let started = *self.cycle_started_ms.get_or_insert(time_ms);
        if time_ms < started {
            self.cycle_started_ms = Some(time_ms);
        } else if time_ms - started >= self.cycle_seconds * 1000.0 {
            self.set_pattern(self.pattern.next());
            self.cycle_started_ms = Some(time_ms);
        }
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        if pattern == self.pattern {
            return;
        }
        debug!("Switching pattern {} -> {}", self.pattern.name(), pattern.name());
        self.fireworks.reset();
        self.pattern = pattern;
        self.cycle_started_ms = None;
    }

    pub fn set_palette(&mut self, palette_name: &str) {
        self.palette_name = palette_name.trim().to_string();
        self.palette = Palette::resolve(&self.palette_name, &self.custom_palettes);
    }

    pub fn set_brightness(&mut self, brightness: f64) {
        self.brightness = brightness.clamp(0.0, 1.0);
    }

    pub fn next_pattern(&mut self) {
        self.set_pattern(self.pattern.next());
    }

    /// Step through the built-in palettes; a custom palette steps back to the first one
    pub fn next_palette(&mut self) {
        let next = PaletteId::from_string(&self.palette_name)
            .map(|id| id.next())
            .unwrap_or(PaletteId::DynamicRainbow);
        self.set_palette(next.name());
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn palette_name(&self) -> &str {
        &self.palette_name
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    /// Live fireworks particles (always 0 for the other patterns)
    pub fn particle_count(&self) -> usize {
        self.fireworks.particle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    fn sim(pattern: Pattern, palette: &str) -> Simulation {
        Simulation::new(pattern, palette, FireworksState::with_seed(7))
    }

    #[test]
    fn test_tick_matches_pattern_render() {
        let mut s = sim(Pattern::ConcentricWaves, "Galaxy");
        let mut scratch = FireworksState::with_seed(1);
        let expected = Pattern::ConcentricWaves.render(1234.0, &Palette::builtin("Galaxy"), &mut scratch);
        assert_eq!(s.tick(1234.0), expected);
    }

    #[test]
    fn test_pattern_switch_resets_fireworks() {
        let mut s = sim(Pattern::Fireworks, "Sunflower");
        for step in 1..20 {
            s.tick(step as f64 * 16.0);
        }
        assert!(s.particle_count() > 0);

        // Same pattern keeps the particles
        s.set_pattern(Pattern::Fireworks);
        assert!(s.particle_count() > 0);

        s.set_pattern(Pattern::Rain);
        assert_eq!(s.particle_count(), 0);
        assert_eq!(s.pattern(), Pattern::Rain);
    }

    #[test]
    fn test_auto_cycle() {
        let mut s = sim(Pattern::Rain, "Aurora");
        s.cycle_seconds = 1.0;

        s.tick(0.0);
        s.tick(999.0);
        assert_eq!(s.pattern(), Pattern::Rain);
        s.tick(1000.0);
        assert_eq!(s.pattern(), Pattern::CenterPulse);
        s.tick(1500.0);
        assert_eq!(s.pattern(), Pattern::CenterPulse);
        s.tick(2000.0);
        assert_eq!(s.pattern(), Pattern::GrowingCube);
    }

    #[test]
    fn test_no_cycle_when_disabled() {
        let mut s = sim(Pattern::Rain, "Aurora");
        for step in 0..100 {
            s.tick(step as f64 * 1000.0);
        }
        assert_eq!(s.pattern(), Pattern::Rain);
    }

    #[test]
    fn test_next_palette() {
        let mut s = sim(Pattern::Rain, "Sunflower");
        s.next_palette();
        assert_eq!(s.palette_name(), "Nautilus");

        s.set_palette("Digital Phi");
        s.next_palette();
        assert_eq!(s.palette_name(), "Dynamic Rainbow");

        s.set_palette("my custom one");
        s.next_palette();
        assert_eq!(s.palette_name(), "Dynamic Rainbow");
    }

    #[test]
    fn test_brightness_zero_is_blank() {
        let mut s = sim(Pattern::Plasma3D, "Galaxy");
        s.set_brightness(-1.0);
        assert_eq!(s.brightness(), 0.0);
        assert!(s.tick(500.0).is_blank());
    }

    #[test]
    fn test_render_at_warms_up_fireworks() {
        let mut a = sim(Pattern::Fireworks, "Galaxy");
        let mut b = sim(Pattern::Fireworks, "Galaxy");

        let snapshot = a.render_at(1000.0, 33.0);
        assert!(a.particle_count() > 0);

        // Same as stepping a live run up to that time
        let mut t = 0.0;
        while t < 1000.0 {
            b.tick(t);
            t += 33.0;
        }
        assert_eq!(b.tick(1000.0), snapshot);
    }

    #[test]
    fn test_render_at_far_future_is_bounded() {
        let mut s = sim(Pattern::Fireworks, "Galaxy");
        // Only the last warm-up window is stepped, so this returns promptly
        s.render_at(1e12, 33.0);
        assert_eq!(s.pattern(), Pattern::Fireworks);
        assert!(s.particle_count() < 10_000);
    }

    #[test]
    fn test_render_at_pure_pattern() {
        let mut s = sim(Pattern::Rain, "Aurora");
        assert_eq!(s.render_at(750.0, 33.0), s.tick(750.0));
    }

    #[test]
    fn test_apply_config() {
        let mut config = CubeConfig::default();
        config.pattern = "stacking planes".to_string();
        config.palette = "Mono".to_string();
        config.palettes.insert("mono".to_string(), "FFFFFF,FFFFFF".to_string());

        let mut s = sim(Pattern::Rain, "Aurora");
        s.apply_config(&config);
        assert_eq!(s.pattern(), Pattern::StackingPlanes);

        // Custom palette is used: stacking planes at t=0 lights layer 0 in white
        let frame = s.tick(0.0);
        assert_eq!(frame.get(0), Rgb::new(255, 255, 255));

        config.pattern = "nonsense".to_string();
        s.apply_config(&config);
        assert_eq!(s.pattern(), Pattern::StackingPlanes);
    }
}
