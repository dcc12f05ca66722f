// Palettes Module - Named color palettes and the palette resolver
use colorgrad::Color;
use std::collections::HashMap;

use crate::types::Rgb;

/// Built-in palette identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteId {
    DynamicRainbow = 0,
    Sunflower = 1,
    Nautilus = 2,
    Aurora = 3,
    PlantGrowth = 4,
    Galaxy = 5,
    GoldenNautilus = 6,
    PsychedelicSunflower = 7,
    RomanescoFractal = 8,
    DigitalPhi = 9,
}

impl PaletteId {
    pub const ALL: [PaletteId; 10] = [
        PaletteId::DynamicRainbow,
        PaletteId::Sunflower,
        PaletteId::Nautilus,
        PaletteId::Aurora,
        PaletteId::PlantGrowth,
        PaletteId::Galaxy,
        PaletteId::GoldenNautilus,
        PaletteId::PsychedelicSunflower,
        PaletteId::RomanescoFractal,
        PaletteId::DigitalPhi,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "dynamic_rainbow" | "rainbow" | "spectrum" => Some(PaletteId::DynamicRainbow),
            "sunflower" => Some(PaletteId::Sunflower),
            "nautilus" => Some(PaletteId::Nautilus),
            "aurora" => Some(PaletteId::Aurora),
            "plant_growth" | "plant" => Some(PaletteId::PlantGrowth),
            "galaxy" => Some(PaletteId::Galaxy),
            "golden_nautilus" => Some(PaletteId::GoldenNautilus),
            "psychedelic_sunflower" | "psychedelic" => Some(PaletteId::PsychedelicSunflower),
            "romanesco_fractal" | "romanesco" => Some(PaletteId::RomanescoFractal),
            "digital_phi" | "phi" => Some(PaletteId::DigitalPhi),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaletteId::DynamicRainbow => "Dynamic Rainbow",
            PaletteId::Sunflower => "Sunflower",
            PaletteId::Nautilus => "Nautilus",
            PaletteId::Aurora => "Aurora",
            PaletteId::PlantGrowth => "Plant Growth",
            PaletteId::Galaxy => "Galaxy",
            PaletteId::GoldenNautilus => "Golden Nautilus",
            PaletteId::PsychedelicSunflower => "Psychedelic Sunflower",
            PaletteId::RomanescoFractal => "Romanesco Fractal",
            PaletteId::DigitalPhi => "Digital Phi",
        }
    }

    pub fn next(&self) -> Self {
        Self::from_index(*self as usize + 1)
    }

    /// Anchor colors, or None for the procedural spectrum
    pub fn anchors(&self) -> Option<&'static [Rgb]> {
        match self {
            PaletteId::DynamicRainbow => None,
            PaletteId::Sunflower => Some(&SUNFLOWER),
            PaletteId::Nautilus => Some(&NAUTILUS),
            PaletteId::Aurora => Some(&AURORA),
            PaletteId::PlantGrowth => Some(&PLANT_GROWTH),
            PaletteId::Galaxy => Some(&GALAXY),
            PaletteId::GoldenNautilus => Some(&GOLDEN_NAUTILUS),
            PaletteId::PsychedelicSunflower => Some(&PSYCHEDELIC_SUNFLOWER),
            PaletteId::RomanescoFractal => Some(&ROMANESCO_FRACTAL),
            PaletteId::DigitalPhi => Some(&DIGITAL_PHI),
        }
    }
}

/// Get list of all built-in palette names
pub fn get_palette_names() -> Vec<&'static str> {
    PaletteId::ALL.iter().map(|p| p.name()).collect()
}

// Anchor palettes are authored at a nominal 50% brightness
const SUNFLOWER: [Rgb; 4] = [
    Rgb::new(0xFD, 0xB8, 0x13),
    Rgb::new(0xFF, 0x8C, 0x00),
    Rgb::new(0xFF, 0x6B, 0x35),
    Rgb::new(0x8B, 0x45, 0x13),
];

const NAUTILUS: [Rgb; 5] = [
    Rgb::new(0x0A, 0x3D, 0x62),
    Rgb::new(0x1F, 0x61, 0x8D),
    Rgb::new(0x34, 0x98, 0xDB),
    Rgb::new(0x5D, 0xAD, 0xE2),
    Rgb::new(0xAE, 0xD6, 0xF1),
];

const AURORA: [Rgb; 5] = [
    Rgb::new(0x9B, 0x59, 0xB6),
    Rgb::new(0x34, 0x98, 0xDB),
    Rgb::new(0x16, 0xA0, 0x85),
    Rgb::new(0xF3, 0x9C, 0x12),
    Rgb::new(0xE7, 0x4C, 0x3C),
];

const PLANT_GROWTH: [Rgb; 4] = [
    Rgb::new(0x27, 0xAE, 0x60),
    Rgb::new(0x52, 0xBE, 0x80),
    Rgb::new(0xF3, 0x9C, 0x12),
    Rgb::new(0xE6, 0x7E, 0x22),
];

const GALAXY: [Rgb; 4] = [
    Rgb::new(0x1A, 0x1A, 0x2E),
    Rgb::new(0x16, 0x21, 0x3E),
    Rgb::new(0x53, 0x34, 0x83),
    Rgb::new(0xE9, 0x45, 0x60),
];

const GOLDEN_NAUTILUS: [Rgb; 5] = [
    Rgb::new(0xF0, 0xEA, 0xD6),
    Rgb::new(0xFF, 0xD7, 0x00),
    Rgb::new(0xDA, 0xA5, 0x20),
    Rgb::new(0xA0, 0x52, 0x2D),
    Rgb::new(0x19, 0x19, 0x70),
];

const PSYCHEDELIC_SUNFLOWER: [Rgb; 5] = [
    Rgb::new(0x2E, 0x11, 0x2D),
    Rgb::new(0xFF, 0xFF, 0x00),
    Rgb::new(0x00, 0xFF, 0x00),
    Rgb::new(0xFF, 0x00, 0xFF),
    Rgb::new(0x8A, 0x2B, 0xE2),
];

const ROMANESCO_FRACTAL: [Rgb; 5] = [
    Rgb::new(0x00, 0x64, 0x00),
    Rgb::new(0x2E, 0x8B, 0x57),
    Rgb::new(0x32, 0xCD, 0x32),
    Rgb::new(0xAD, 0xFF, 0x2F),
    Rgb::new(0xF0, 0xFF, 0xF0),
];

const DIGITAL_PHI: [Rgb; 4] = [
    Rgb::new(0xFF, 0x00, 0xFF),
    Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0xFF, 0xA5, 0x00),
    Rgb::new(0x00, 0x00, 0x00),
];

/// A resolved palette, ready to be sampled many times per frame
#[derive(Debug, Clone, PartialEq)]
pub enum Palette {
    /// Hue sweep: t is the hue, brightness is the HSL lightness
    Spectrum,
    /// Piecewise-linear interpolation through anchor colors
    Anchors(Vec<Rgb>),
}

impl Palette {
    /// Resolve a palette by name. Custom palettes (name -> "RRGGBB,RRGGBB,...") win over
    /// built-ins; anything unrecognized falls back to the spectrum.
    pub fn resolve(name: &str, custom: &HashMap<String, String>) -> Self {
        let trimmed = name.trim();

        for (custom_name, hex_colors) in custom.iter() {
            if custom_name.eq_ignore_ascii_case(trimmed) {
                match Rgb::parse_list(hex_colors) {
                    Ok(colors) if colors.len() >= 2 => return Palette::Anchors(colors),
                    Ok(_) => log::warn!("Custom palette '{}' needs at least two colors", custom_name),
                    Err(e) => log::warn!("Custom palette '{}' is invalid: {}", custom_name, e),
                }
            }
        }

        Self::builtin(trimmed)
    }

    /// Sample with `t` always wrapped, so 1.0 is the start of the palette again.
    /// Generators use this; their hue ramps are cyclic.
    pub fn cycle_at(&self, t: f64, brightness: f64) -> Rgb {
        self.color_at(wrap_unit(t), brightness)
    }

    /// Resolve a built-in palette by name
    pub fn builtin(name: &str) -> Self {
        match PaletteId::from_string(name).and_then(|id| id.anchors()) {
            Some(anchors) => Palette::Anchors(anchors.to_vec()),
            None => Palette::Spectrum,
        }
    }

    /// Sample the palette at position `t` (wrapped modulo 1) with the given brightness.
    /// Exactly 1.0 is the end of the palette, so [0, 1] spans first to last anchor.
    /// Anchors are authored at brightness 0.5; higher values brighten them until channels clip.
    pub fn color_at(&self, t: f64, brightness: f64) -> Rgb {
        let t = if t == 1.0 { t } else { wrap_unit(t) };

        match self {
            Palette::Spectrum => hsl_color(t, brightness),
            Palette::Anchors(anchors) if anchors.len() >= 2 => {
                let scaled = t * (anchors.len() - 1) as f64;
                let index1 = scaled.floor() as usize;
                let index2 = (index1 + 1).min(anchors.len() - 1);
                let amount = scaled - index1 as f64;

                let color = lerp_color(anchors[index1], anchors[index2], amount);
                color.scale(brightness * 2.0)
            }
            Palette::Anchors(anchors) => anchors
                .first()
                .map(|c| c.scale(brightness * 2.0))
                .unwrap_or(Rgb::BLACK),
        }
    }
}

/// Resolve a color from a built-in palette name
pub fn resolve(palette_name: &str, t: f64, brightness: f64) -> Rgb {
    Palette::builtin(palette_name).color_at(t, brightness)
}

/// Full-saturation HSL color with `hue` in 0.0-1.0 and `lightness` as the brightness
pub fn hsl_color(hue: f64, lightness: f64) -> Rgb {
    let color = Color::from_hsla(wrap_unit(hue) * 360.0, 1.0, lightness.clamp(0.0, 1.0), 1.0);
    let [r, g, b, _] = color.to_rgba8();
    Rgb::new(r, g, b)
}

/// Wrap any real number into [0, 1), including negative input.
/// The result is snapped to 1e-9 so 1.3 and 0.3 land on the same position.
pub fn wrap_unit(t: f64) -> f64 {
    let wrapped = (t.rem_euclid(1.0) * 1e9).round() / 1e9;
    // Tiny negative inputs and values just under 1.0 snap up to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

fn lerp_color(c1: Rgb, c2: Rgb, amount: f64) -> Rgb {
    let lerp = |a: u8, b: u8| a as f64 * (1.0 - amount) + b as f64 * amount;
    Rgb::from_f64(lerp(c1.r, c2.r), lerp(c1.g, c2.g), lerp(c1.b, c2.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor_palettes() -> impl Iterator<Item = PaletteId> {
        PaletteId::ALL.into_iter().filter(|p| p.anchors().is_some())
    }

    #[test]
    fn test_names_round_trip() {
        for id in PaletteId::ALL {
            assert_eq!(PaletteId::from_string(id.name()), Some(id));
        }
        assert_eq!(PaletteId::from_string("golden_nautilus"), Some(PaletteId::GoldenNautilus));
        assert_eq!(PaletteId::from_string("  DIGITAL PHI "), Some(PaletteId::DigitalPhi));
        assert_eq!(PaletteId::from_string("Plaid"), None);
        assert_eq!(get_palette_names().len(), 10);
    }

    #[test]
    fn test_wraparound() {
        for id in anchor_palettes() {
            let name = id.name();
            for b in [0.3, 0.5, 0.8, 1.0] {
                assert_eq!(resolve(name, 1.3, b), resolve(name, 0.3, b), "{}", name);
                assert_eq!(resolve(name, -0.2, b), resolve(name, 0.8, b), "{}", name);
                assert_eq!(resolve(name, 2.0, b), resolve(name, 0.0, b), "{}", name);
            }
        }
    }

    #[test]
    fn test_wraparound_digital_phi_rounding() {
        // 1.3 wraps to 0.30000000000000004, which sits on a rounding tie in this palette
        for b in [0.3, 0.5, 0.8, 1.0] {
            assert_eq!(resolve("Digital Phi", 1.3, b), resolve("Digital Phi", 0.3, b));
        }
        assert_eq!(wrap_unit(1.3), wrap_unit(0.3));
    }

    #[test]
    fn test_cycle_at_wraps_one_to_start() {
        let a = Rgb::new(10, 100, 200);
        let b = Rgb::new(100, 20, 60);
        let palette = Palette::Anchors(vec![a, b]);

        assert_eq!(palette.color_at(1.0, 0.5), b);
        assert_eq!(palette.cycle_at(1.0, 0.5), a);
        assert_eq!(palette.cycle_at(0.25, 0.5), palette.color_at(0.25, 0.5));
    }

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(0.25), 0.25);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert!(wrap_unit(-1e-20) < 1.0);
    }

    #[test]
    fn test_anchor_endpoints() {
        let a = Rgb::new(10, 100, 200);
        let b = Rgb::new(100, 20, 60);
        let palette = Palette::Anchors(vec![a, b]);

        assert_eq!(palette.color_at(0.0, 0.5), a);
        assert_eq!(palette.color_at(1.0, 0.5), b);
        assert_eq!(palette.color_at(0.999_999, 0.5), b);
        // Past the end it wraps around again
        assert_eq!(palette.color_at(2.0, 0.5), a);
        // Full brightness doubles and clamps
        assert_eq!(palette.color_at(0.0, 1.0), Rgb::new(20, 200, 255));
    }

    #[test]
    fn test_anchor_midpoint_interpolates() {
        let palette = Palette::Anchors(vec![Rgb::new(0, 0, 0), Rgb::new(200, 100, 50)]);
        assert_eq!(palette.color_at(0.5, 0.5), Rgb::new(100, 50, 25));
        assert_eq!(palette.color_at(0.5, 0.25), Rgb::new(50, 25, 13));
    }

    #[test]
    fn test_builtin_first_anchor() {
        assert_eq!(resolve("Sunflower", 0.0, 0.5), Rgb::new(0xFD, 0xB8, 0x13));
        assert_eq!(resolve("Digital Phi", 0.0, 0.5), Rgb::new(0xFF, 0x00, 0xFF));
    }

    #[test]
    fn test_spectrum_fallback() {
        assert_eq!(resolve("Dynamic Rainbow", 0.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(resolve("no such palette", 0.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(resolve("Dynamic Rainbow", 1.0 / 3.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(resolve("Dynamic Rainbow", 0.0, 0.0), Rgb::BLACK);
        assert_eq!(resolve("Dynamic Rainbow", 0.5, 1.0), Rgb::new(255, 255, 255));
        // Negative hues wrap as well
        assert_eq!(resolve("Dynamic Rainbow", -2.0 / 3.0, 0.5), resolve("Dynamic Rainbow", 1.0 / 3.0, 0.5));
    }

    #[test]
    fn test_custom_palette_overrides() {
        let mut custom = HashMap::new();
        custom.insert("Ember".to_string(), "FF0000,000000".to_string());
        custom.insert("Broken".to_string(), "FF0000,XYZ".to_string());

        let ember = Palette::resolve("ember", &custom);
        assert_eq!(ember, Palette::Anchors(vec![Rgb::new(255, 0, 0), Rgb::BLACK]));
        assert_eq!(Palette::resolve("Broken", &custom), Palette::Spectrum);
        assert_eq!(
            Palette::resolve("Galaxy", &custom),
            Palette::Anchors(PaletteId::Galaxy.anchors().unwrap().to_vec())
        );
    }

    #[test]
    fn test_single_anchor_palette_is_solid() {
        let palette = Palette::Anchors(vec![Rgb::new(40, 50, 60)]);
        assert_eq!(palette.color_at(0.7, 0.5), Rgb::new(40, 50, 60));
    }
}
