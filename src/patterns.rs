// Patterns Module - Procedural cube animations
//
// Every generator takes the animation time in milliseconds and a resolved palette
// and returns a freshly built frame. All of them are pure except Fireworks, which
// advances the simulation context it is handed.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::cube::{cells, distance_from_center, CENTER, CUBE_SIZE};
use crate::fireworks::{self, FireworksState};
use crate::frame::Frame;
use crate::palettes::{hsl_color, Palette};
use crate::types::Rgb;

const SIZE: f64 = CUBE_SIZE as f64;
const PHI: f64 = 1.618;
const GOLDEN_ANGLE: f64 = PI * 0.763_932_022_500_210_3; // PI * (3 - sqrt(5))

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    SphericalPhyllotaxis = 0,
    ConcentricWaves = 1,
    GoldenDoubleHelix = 2,
    Rain = 3,
    CenterPulse = 4,
    GrowingCube = 5,
    StackingPlanes = 6,
    Tree3D = 7,
    Plasma3D = 8,
    Fireworks = 9,
    AxisFill = 10,
    LissajousPath = 11,
}

impl Pattern {
    pub const ALL: [Pattern; 12] = [
        Pattern::SphericalPhyllotaxis,
        Pattern::ConcentricWaves,
        Pattern::GoldenDoubleHelix,
        Pattern::Rain,
        Pattern::CenterPulse,
        Pattern::GrowingCube,
        Pattern::StackingPlanes,
        Pattern::Tree3D,
        Pattern::Plasma3D,
        Pattern::Fireworks,
        Pattern::AxisFill,
        Pattern::LissajousPath,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Exact index lookup, used when the firmware reports a pattern number
    pub fn get(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "spherical_phyllotaxis" | "phyllotaxis" | "sphere" => Some(Pattern::SphericalPhyllotaxis),
            "concentric_waves" | "waves" => Some(Pattern::ConcentricWaves),
            "golden_double_helix" | "double_helix" | "helix" => Some(Pattern::GoldenDoubleHelix),
            "rain" => Some(Pattern::Rain),
            "center_pulse" | "pulse" => Some(Pattern::CenterPulse),
            "growing_cube" | "cube" => Some(Pattern::GrowingCube),
            "stacking_planes" | "planes" => Some(Pattern::StackingPlanes),
            "3d_tree" | "tree_3d" | "tree" => Some(Pattern::Tree3D),
            "3d_plasma" | "plasma_3d" | "plasma" => Some(Pattern::Plasma3D),
            "fireworks" => Some(Pattern::Fireworks),
            "axis_fill" | "fill" => Some(Pattern::AxisFill),
            "lissajous_path" | "lissajous" => Some(Pattern::LissajousPath),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::SphericalPhyllotaxis => "Spherical Phyllotaxis",
            Pattern::ConcentricWaves => "Concentric Waves",
            Pattern::GoldenDoubleHelix => "Golden Double Helix",
            Pattern::Rain => "Rain",
            Pattern::CenterPulse => "Center Pulse",
            Pattern::GrowingCube => "Growing Cube",
            Pattern::StackingPlanes => "Stacking Planes",
            Pattern::Tree3D => "3D Tree",
            Pattern::Plasma3D => "3D Plasma",
            Pattern::Fireworks => "Fireworks",
            Pattern::AxisFill => "Axis Fill",
            Pattern::LissajousPath => "Lissajous Path",
        }
    }

    pub fn next(&self) -> Self {
        Self::from_index(*self as usize + 1)
    }

    /// True if the pattern carries simulation state between frames
    pub fn is_stateful(&self) -> bool {
        matches!(self, Pattern::Fireworks)
    }

    /// Render one frame of this pattern
    pub fn render(&self, time: f64, palette: &Palette, fireworks: &mut FireworksState) -> Frame {
        match self {
            Pattern::SphericalPhyllotaxis => spherical_phyllotaxis(time, palette),
            Pattern::ConcentricWaves => concentric_waves(time, palette),
            Pattern::GoldenDoubleHelix => golden_double_helix(time, palette),
            Pattern::Rain => rain(time, palette),
            Pattern::CenterPulse => center_pulse(time, palette),
            Pattern::GrowingCube => growing_cube(time, palette),
            Pattern::StackingPlanes => stacking_planes(time, palette),
            Pattern::Tree3D => tree_3d(time, palette),
            Pattern::Plasma3D => plasma_3d(time, palette),
            Pattern::Fireworks => fireworks::render(fireworks, time, palette),
            Pattern::AxisFill => axis_fill(time, palette),
            Pattern::LissajousPath => lissajous_path(time, palette),
        }
    }
}

/// Get list of all pattern names in firmware order
pub fn get_pattern_names() -> Vec<&'static str> {
    Pattern::ALL.iter().map(|p| p.name()).collect()
}

/// Name-based entry point: unknown pattern names produce a blank frame and
/// unknown palette names fall back to the spectrum.
pub fn generate(pattern_name: &str, time: f64, palette_name: &str, fireworks: &mut FireworksState) -> Frame {
    match Pattern::from_string(pattern_name) {
        Some(pattern) => {
            let palette = Palette::resolve(palette_name, &HashMap::new());
            pattern.render(time, &palette, fireworks)
        }
        None => Frame::new(),
    }
}

// Linear remap of value from [start1, stop1] to [start2, stop2]
fn map_range(value: f64, start1: f64, stop1: f64, start2: f64, stop2: f64) -> f64 {
    start2 + (stop2 - start2) * ((value - start1) / (stop1 - start1))
}

// Pattern 0: golden-angle point spiral wrapped around a sphere
fn spherical_phyllotaxis(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let rotation = time / 5000.0;
    let num_points = 256;

    for i in 0..num_points {
        let z_norm = map_range(i as f64, 0.0, num_points as f64, -1.0, 1.0);
        let radius = (1.0 - z_norm * z_norm).sqrt();
        let theta = GOLDEN_ANGLE * i as f64 + rotation;

        let x_norm = theta.cos() * radius;
        let y_norm = theta.sin() * radius;

        let x = map_range(x_norm, -1.0, 1.0, 0.0, SIZE).floor() as i32;
        let y = map_range(y_norm, -1.0, 1.0, 0.0, SIZE).floor() as i32;
        let z = map_range(z_norm, -1.0, 1.0, 0.0, SIZE).floor() as i32;

        let hue = (i as f64 / num_points as f64 + time / 10000.0) % 1.0;
        frame.set_xyz(x, y, z, palette.cycle_at(hue, 0.5));
    }
    frame
}

// Pattern 1: spherical sine waves rolling out of the center
fn concentric_waves(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 1000.0;

    for (i, x, y, z) in cells() {
        let dist = distance_from_center(x, y, z);
        let brightness = map_range((dist - t).sin(), -1.0, 1.0, 0.0, 1.0);
        if brightness > 0.1 {
            let hue = (dist / (SIZE * 0.8)) % 1.0;
            frame.set(i, palette.cycle_at(hue, brightness * 0.5));
        }
    }
    frame
}

// Pattern 2: two counter-phased helices climbing the y axis
fn golden_double_helix(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 1500.0;
    let turns = PHI * 2.0;
    let radius = SIZE / 2.0 - 1.5;
    let threshold = 1.5;

    for (i, x, y, z) in cells() {
        let y_norm = map_range(y as f64, 0.0, SIZE - 1.0, 0.0, 1.0);
        let angle = y_norm * 2.0 * PI * turns + t;

        let strand_distance = |phase: f64| {
            let target_x = CENTER + (angle + phase).cos() * radius;
            let target_z = CENTER + (angle + phase).sin() * radius;
            ((x as f64 - target_x).powi(2) + (z as f64 - target_z).powi(2)).sqrt()
        };
        let dist = strand_distance(0.0).min(strand_distance(PI));

        if dist < threshold {
            let brightness = map_range(dist, 0.0, threshold, 1.0, 0.0);
            let hue = (y_norm + t / 5.0) % 1.0;
            frame.set(i, palette.cycle_at(hue, brightness * 0.5));
        }
    }
    frame
}

// Pattern 3: columns of falling drops with a short dim tail
fn rain(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let num_drops = 34;

    for i in 0..num_drops {
        let fi = i as f64;
        // Column positions are fixed per drop, independent of time
        let x = (((fi * PHI).sin() * 0.5 + 0.5) * SIZE).floor() as i32;
        let z = (((fi * 1.3).cos() * 0.5 + 0.5) * SIZE).floor() as i32;
        let speed = map_range(fi, 0.0, num_drops as f64, 0.5, 2.5);
        let t = (time / 500.0) * speed;
        let y = SIZE - 1.0 - (t % SIZE);
        let color = palette.cycle_at(fi / num_drops as f64, 0.6);

        for (j, brightness) in [(0, 1.0), (1, 0.3)] {
            let current_y = (y + j as f64).floor() as i32;
            frame.blend_max_xyz(x, current_y, z, color.scale(brightness));
        }
    }
    frame
}

// Pattern 4: a single shell expanding from the center
fn center_pulse(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 800.0;
    let pulse_width = 1.5;
    let max_dist = (3.0 * CENTER * CENTER).sqrt();
    let pulse_position = t % (max_dist + pulse_width * 2.0);

    for (i, x, y, z) in cells() {
        let dist = distance_from_center(x, y, z);
        let dist_from_pulse = (dist - pulse_position).abs();

        if dist_from_pulse < pulse_width {
            let brightness = map_range(dist_from_pulse, 0.0, pulse_width, 1.0, 0.0);
            let hue = (dist / max_dist + time / 10000.0) % 1.0;
            frame.set(i, palette.cycle_at(hue, brightness * 0.6));
        }
    }
    frame
}

// Pattern 5: a centered solid cube stepping through sizes 0..=N
fn growing_cube(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let stages = CUBE_SIZE + 1;
    let cycle_duration = 10000.0;
    let stage_duration = cycle_duration / stages as f64;
    let stage = (((time % cycle_duration) / stage_duration).floor() as usize).min(stages - 1);
    let size = stage as i32;
    if size == 0 {
        return frame;
    }

    let start = (CENTER - (size - 1) as f64 / 2.0).floor() as i32;
    let end = start + size;
    let color = palette.cycle_at(stage as f64 / stages as f64, 0.5);

    for x in start..end {
        for y in start..end {
            for z in start..end {
                frame.set_xyz(x, y, z, color);
            }
        }
    }
    frame
}

// Pattern 6: z layers filling up one at a time
fn stacking_planes(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let num_planes = 1 + ((time / 1500.0) % SIZE).floor() as i32;
    let color = palette.cycle_at(num_planes as f64 / SIZE, 0.6);

    for z in 0..num_planes {
        for y in 0..CUBE_SIZE as i32 {
            for x in 0..CUBE_SIZE as i32 {
                frame.set_xyz(x, y, z, color);
            }
        }
    }
    frame
}

// Pattern 7: a growing conifer with blinking ornaments
fn tree_3d(time: f64, _palette: &Palette) -> Frame {
    const TRUNK: Rgb = Rgb::new(139, 69, 19);
    const FOLIAGE: Rgb = Rgb::new(0, 100, 20);
    const ORNAMENT_CHANCE: f64 = 0.1;

    let mut frame = Frame::new();
    let t = (time / 5000.0) % 1.0;
    let growth = (t * PI).sin();
    // Ornament flicker is random-looking but reproducible for a given time
    let mut rng = StdRng::seed_from_u64(time.to_bits());

    let trunk_height = (growth * 2.0).floor() as i32;
    for y in 0..trunk_height {
        for (x, z) in [(3, 3), (4, 3), (3, 4), (4, 4)] {
            frame.set_xyz(x, y, z, TRUNK);
        }
    }

    let tree_height = (growth * (SIZE - 1.0)).floor() as i32 + 1;
    for y in 1..tree_height {
        let radius = (SIZE / 2.5) * (1.0 - y as f64 / SIZE);
        for x in 0..CUBE_SIZE as i32 {
            for z in 0..CUBE_SIZE as i32 {
                let dist = ((x as f64 - CENTER).powi(2) + (z as f64 - CENTER).powi(2)).sqrt();
                if dist >= radius {
                    continue;
                }

                let sparkle = (x as f64 + z as f64 + time / 200.0).sin() > 0.8;
                if sparkle && rng.gen::<f64>() < ORNAMENT_CHANCE {
                    let hue = (x as f64 + y as f64 + z as f64 + time / 1000.0) % 1.0;
                    frame.set_xyz(x, y, z, hsl_color(hue, 0.5));
                } else {
                    frame.set_xyz(x, y, z, FOLIAGE);
                }
            }
        }
    }
    frame
}

// Pattern 8: four interfering sine fields
fn plasma_3d(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 2000.0;

    for (i, x, y, z) in cells() {
        let (fx, fy, fz) = (x as f64, y as f64, z as f64);
        let v = (fx * 0.5 + t).sin()
            + (fy * 0.5 + t).sin()
            + (fz * 0.5 + t).sin()
            + ((fx + fy + fz) * 0.3 + t).sin();
        let brightness = map_range(v, -4.0, 4.0, 0.0, 1.0);
        let hue = 0.5 + 0.5 * ((fx - fy + fz) * 0.2 + t).sin();
        frame.set(i, palette.cycle_at(hue, brightness * 0.5));
    }
    frame
}

// Pattern 10: y layers rising and falling like a liquid level
fn axis_fill(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 3000.0;
    let fill_level = (t.sin() + 1.0) / 2.0 * SIZE;

    for y in 0..CUBE_SIZE as i32 {
        if (y as f64) < fill_level {
            let hue = map_range(y as f64, 0.0, SIZE - 1.0, 0.0, 1.0);
            let color = palette.cycle_at(hue, 0.5);
            for x in 0..CUBE_SIZE as i32 {
                for z in 0..CUBE_SIZE as i32 {
                    frame.set_xyz(x, y, z, color);
                }
            }
        }
    }
    frame
}

// Pattern 11: a comet tracing a 3D Lissajous knot
fn lissajous_path(time: f64, palette: &Palette) -> Frame {
    let mut frame = Frame::new();
    let t = time / 2000.0;
    let amplitude = SIZE / 2.0 - 1.0;
    let tail_length = 20;

    for i in 0..tail_length {
        let sample_time = t - i as f64 * 0.02;
        let x = CENTER + amplitude * (sample_time * 1.0).sin();
        let y = CENTER + amplitude * (sample_time * PHI).cos();
        let z = CENTER + amplitude * (sample_time * (PHI + 1.0)).sin();

        let brightness = map_range(i as f64, 0.0, tail_length as f64, 0.7, 0.0);
        let hue = (sample_time / 5.0) % 1.0;
        frame.blend_max_xyz(
            x.round() as i32,
            y.round() as i32,
            z.round() as i32,
            palette.cycle_at(hue, brightness),
        );
    }
    frame
}
