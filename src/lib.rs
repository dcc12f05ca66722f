// Pattern engine
pub mod cube;
pub mod fireworks;
pub mod frame;
pub mod palettes;
pub mod patterns;
pub mod types;

// Runtime: config, driver, input relay and terminal preview
pub mod config;
pub mod preview;
pub mod relay;
pub mod simulation;

pub use cube::{index_to_xyz, xyz_to_index, CUBE_SIZE, NUM_LEDS};
pub use fireworks::FireworksState;
pub use frame::{Frame, FrameError};
pub use palettes::{resolve, Palette, PaletteId};
pub use patterns::{generate, Pattern};
pub use simulation::Simulation;
pub use types::Rgb;
