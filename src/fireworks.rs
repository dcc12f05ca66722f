// Fireworks Module - Rockets and expanding shell explosions
//
// Unlike the other patterns this one carries state between frames. The state lives in
// a FireworksState owned by the caller, and frames must be rendered in time order.
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cube::{cells, CENTER};
use crate::frame::Frame;
use crate::palettes::Palette;
use crate::types::Rgb;

const DT: f64 = 0.1; // Simulation step per rendered frame
const GRAVITY: f64 = 9.8 * DT * 0.4; // Velocity lost per step
const EXPANSION_RATE: f64 = 4.0 * DT; // Shell radius gained per step
const FADE_RATE: f64 = 0.3 * DT; // Life lost per step
const ROCKET_COLOR: Rgb = Rgb::new(255, 255, 200);

#[derive(Debug, Clone, PartialEq)]
pub struct Rocket {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vy: f64,
    pub hue: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
    pub max_radius: f64,
    pub life: f64,
    pub hue: f64,
}

pub struct FireworksState {
    rockets: Vec<Rocket>,
    explosions: Vec<Explosion>,
    next_launch_ms: f64,
    last_time: Option<f64>,
    rng: StdRng,
}

impl FireworksState {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible launches, for tests and `--seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        FireworksState {
            rockets: Vec::new(),
            explosions: Vec::new(),
            next_launch_ms: 0.0,
            last_time: None,
            rng,
        }
    }

    /// Drop every rocket and explosion and re-arm the launch timer
    pub fn reset(&mut self) {
        self.rockets.clear();
        self.explosions.clear();
        self.next_launch_ms = 0.0;
        self.last_time = None;
    }

    pub fn rockets(&self) -> &[Rocket] {
        &self.rockets
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Rockets plus explosions currently alive
    pub fn particle_count(&self) -> usize {
        self.rockets.len() + self.explosions.len()
    }

    fn launch(&mut self, time: f64) {
        let rocket = Rocket {
            x: CENTER + (self.rng.gen::<f64>() - 0.5) * 4.0,
            y: 0.0,
            z: CENTER + (self.rng.gen::<f64>() - 0.5) * 4.0,
            vy: 7.0 + self.rng.gen::<f64>() * 2.0,
            hue: self.rng.gen::<f64>(),
        };
        debug!("Launching rocket at ({:.2}, {:.2}) vy={:.2}", rocket.x, rocket.z, rocket.vy);
        self.rockets.push(rocket);
        self.next_launch_ms = time + 1500.0 + self.rng.gen::<f64>() * 2000.0;
    }
}

impl Default for FireworksState {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the simulation by one step and render it
pub fn render(state: &mut FireworksState, time: f64, palette: &Palette) -> Frame {
    if state.last_time.is_some_and(|last| time < last) {
        debug!("Time went backwards ({:.0}ms), resetting fireworks", time);
        state.reset();
    }
    state.last_time = Some(time);

    let mut frame = Frame::new();

    if time > state.next_launch_ms {
        state.launch(time);
    }

    // Rockets climb until they stall, then burst
    let mut still_flying = Vec::with_capacity(state.rockets.len());
    for mut rocket in std::mem::take(&mut state.rockets) {
        rocket.y += rocket.vy * DT;
        rocket.vy -= GRAVITY;

        if rocket.vy > 0.0 {
            frame.set_xyz(
                rocket.x.round() as i32,
                rocket.y.round() as i32,
                rocket.z.round() as i32,
                ROCKET_COLOR,
            );
            still_flying.push(rocket);
        } else {
            let explosion = Explosion {
                x: rocket.x,
                y: rocket.y,
                z: rocket.z,
                radius: 0.0,
                max_radius: 4.0 + state.rng.gen::<f64>() * 3.0,
                life: 1.0,
                hue: rocket.hue,
            };
            debug!(
                "Rocket burst at ({:.2}, {:.2}, {:.2}), max radius {:.2}",
                explosion.x, explosion.y, explosion.z, explosion.max_radius
            );
            state.explosions.push(explosion);
        }
    }
    state.rockets = still_flying;

    // Shells grow and fade; only the ones still alive are kept
    let mut still_burning = Vec::with_capacity(state.explosions.len());
    for mut explosion in std::mem::take(&mut state.explosions) {
        explosion.radius += EXPANSION_RATE;
        explosion.life -= FADE_RATE;

        if explosion.life <= 0.0 {
            continue;
        }

        for (i, x, y, z) in cells() {
            let dx = x as f64 - explosion.x;
            let dy = y as f64 - explosion.y;
            let dz = z as f64 - explosion.z;
            let dist = (dx * dx + dy * dy + dz * dz).sqrt();
            let dist_from_shell = (dist - explosion.radius).abs();

            if dist_from_shell < 1.0 {
                let brightness = (1.0 - dist_from_shell) * explosion.life * 0.7;
                if brightness > 0.1 {
                    frame.blend_max(i, palette.cycle_at(explosion.hue, brightness));
                }
            }
        }
        still_burning.push(explosion);
    }
    state.explosions = still_burning;

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_launches_a_rocket() {
        let mut state = FireworksState::with_seed(3);
        let frame = render(&mut state, 1.0, &Palette::Spectrum);

        assert_eq!(state.rockets().len(), 1);
        assert!(state.explosions().is_empty());
        assert_eq!(frame.leds().iter().filter(|&&c| c == ROCKET_COLOR).count(), 1);
        assert!(state.next_launch_ms >= 1501.0 && state.next_launch_ms < 3501.0);
    }

    #[test]
    fn test_no_launch_at_time_zero() {
        let mut state = FireworksState::with_seed(3);
        let frame = render(&mut state, 0.0, &Palette::Spectrum);
        assert_eq!(state.particle_count(), 0);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_rocket_bursts_and_shell_burns_out() {
        let mut state = FireworksState::with_seed(42);
        let palette = Palette::Spectrum;
        let mut time = 1.0;

        render(&mut state, time, &palette);
        // Only the one rocket for this run
        state.next_launch_ms = f64::INFINITY;

        let mut last_rocket = state.rockets()[0].clone();
        let mut burst_seen = false;
        let mut burnt_out = false;

        for _ in 0..200 {
            time += 16.0;
            let frame = render(&mut state, time, &palette);

            if !burst_seen {
                if let Some(rocket) = state.rockets().first() {
                    assert!(rocket.vy > 0.0);
                    assert!(rocket.y > last_rocket.y);
                    last_rocket = rocket.clone();
                    continue;
                }
                // The rocket just stalled and became an explosion at its last position
                burst_seen = true;
                assert_eq!(state.explosions().len(), 1);
                let explosion = &state.explosions()[0];
                assert_eq!(explosion.hue, last_rocket.hue);
                assert_eq!(explosion.x, last_rocket.x);
                assert_eq!(explosion.z, last_rocket.z);
                assert!(last_rocket.vy - GRAVITY <= 0.0);
                assert!(explosion.max_radius >= 4.0 && explosion.max_radius < 7.0);
                assert!(explosion.life < 1.0 && explosion.life > 0.9);
            } else if state.explosions().is_empty() {
                burnt_out = true;
                assert!(frame.is_blank());
                break;
            } else {
                assert!(state.explosions()[0].life > 0.0);
            }
        }

        assert!(burst_seen, "rocket never burst");
        assert!(burnt_out, "explosion never burnt out");

        // Nothing left to draw afterwards
        let frame = render(&mut state, time + 16.0, &palette);
        assert!(frame.is_blank());
        assert_eq!(state.particle_count(), 0);
    }

    #[test]
    fn test_same_seed_same_show() {
        let palette = Palette::builtin("Aurora");
        let mut a = FireworksState::with_seed(11);
        let mut b = FireworksState::with_seed(11);
        for step in 0..300 {
            let time = step as f64 * 33.0;
            assert_eq!(render(&mut a, time, &palette), render(&mut b, time, &palette));
        }
    }

    #[test]
    fn test_launches_keep_coming() {
        let mut state = FireworksState::with_seed(5);
        let palette = Palette::Spectrum;
        let mut max_particles = 0;
        let mut lit_frames = 0;
        for step in 1..=600 {
            let frame = render(&mut state, step as f64 * 20.0, &palette);
            max_particles = max_particles.max(state.particle_count());
            if !frame.is_blank() {
                lit_frames += 1;
            }
        }
        assert!(max_particles >= 1);
        assert!(lit_frames > 50);
    }

    #[test]
    fn test_backwards_time_resets() {
        let mut state = FireworksState::with_seed(9);
        let palette = Palette::Spectrum;
        for step in 1..40 {
            render(&mut state, step as f64 * 16.0, &palette);
        }
        assert!(state.particle_count() > 0);

        let frame = render(&mut state, 0.0, &palette);
        assert_eq!(state.particle_count(), 0);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_shell_never_darkens_brighter_cells() {
        let mut state = FireworksState::with_seed(1);
        state.explosions.push(Explosion {
            x: CENTER,
            y: CENTER,
            z: CENTER,
            radius: 1.0,
            max_radius: 5.0,
            life: 1.0,
            hue: 0.0,
        });
        state.explosions.push(Explosion {
            x: CENTER,
            y: CENTER,
            z: CENTER,
            radius: 1.0,
            max_radius: 5.0,
            life: 0.5,
            hue: 0.5,
        });
        state.next_launch_ms = f64::INFINITY;

        let frame = render(&mut state, 0.0, &Palette::Spectrum);
        let solo = {
            let mut only_bright = FireworksState::with_seed(1);
            only_bright.explosions.push(state.explosions()[0].clone());
            only_bright.explosions[0].radius = 1.0;
            only_bright.explosions[0].life = 1.0;
            only_bright.next_launch_ms = f64::INFINITY;
            render(&mut only_bright, 0.0, &Palette::Spectrum)
        };
        // The dimmer shell at the same place never overrides the brighter one
        for i in 0..frame.leds().len() {
            assert!(frame.get(i).luminance() >= solo.get(i).luminance());
        }
    }
}
