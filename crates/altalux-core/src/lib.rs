//! AltaLux Core - local contrast enhancement library
//!
//! This crate implements Contrast-Limited Adaptive Histogram Equalization (CLAHE)
//! on 8-bit luminance planes, together with the color and packed-YUV plumbing
//! needed to apply it to common pixel formats.
//!
//! The image is split into a grid of tiles. Each tile gets a clipped, equalized
//! gray-level mapping (phase 1), and every pixel is then rebuilt by bilinear
//! interpolation between the mappings of its four nearest tiles (phase 2). The
//! two phases can be scheduled by several [`Strategy`] variants which all
//! produce byte-identical output.

pub mod filter;
pub mod grid;
pub mod histogram;
pub mod interpolate;
pub mod luminance;

pub use filter::{AltaLuxError, AltaLuxFilter, PixelFormat, Strategy};
pub use grid::TileGrid;

/// Number of gray levels in an 8-bit luminance plane.
pub const NUM_GRAY_LEVELS: usize = 256;

/// Largest gray value.
pub const MAX_GRAY_VALUE: u32 = (NUM_GRAY_LEVELS - 1) as u32;

/// Strength that leaves the image untouched.
pub const MIN_STRENGTH: u32 = 0;
/// Strength used when none is configured.
pub const DEFAULT_STRENGTH: u32 = 25;
/// Strongest contrast enhancement.
pub const MAX_STRENGTH: u32 = 100;
/// Preset for a gentle enhancement.
pub const LIGHT_CONTRAST_STRENGTH: u32 = 5;
/// Preset for a marked enhancement.
pub const HEAVY_CONTRAST_STRENGTH: u32 = 10;

/// Minimum number of tiles per axis.
pub const MIN_REGIONS: u32 = 2;
/// Default number of tiles per axis.
pub const DEFAULT_REGIONS: u32 = 8;
/// Maximum number of tiles per axis.
pub const MAX_REGIONS: u32 = 16;

/// Clip fraction at [`MIN_STRENGTH`]; equivalent to no processing.
pub const MIN_CLIP_LIMIT: f32 = 1.0;
/// Clip fraction at [`DEFAULT_STRENGTH`].
pub const DEFAULT_CLIP_LIMIT: f32 = 2.0;
/// Clip fraction at [`MAX_STRENGTH`].
pub const MAX_CLIP_LIMIT: f32 = 5.0;

/// Persistable filter configuration.
///
/// The host layer owns storage; this type only fixes the shape and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Enhancement strength (0 to 100, 0 disables the filter)
    pub strength: u32,
    /// Number of tiles across (2 to 16)
    pub horizontal_regions: u32,
    /// Number of tiles down (2 to 16)
    pub vertical_regions: u32,
    /// Scheduling strategy for the two processing phases
    pub strategy: Strategy,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            horizontal_regions: DEFAULT_REGIONS,
            vertical_regions: DEFAULT_REGIONS,
            strategy: Strategy::default(),
        }
    }
}

impl FilterSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if these settings leave images unchanged
    pub fn is_pass_through(&self) -> bool {
        self.strength == MIN_STRENGTH
    }
}

/// Convert a user-facing strength into the clip fraction used by the clipper.
///
/// Maps `[MIN_STRENGTH, MAX_STRENGTH]` linearly onto
/// `[MIN_CLIP_LIMIT, MAX_CLIP_LIMIT]`; out of range strengths are clamped.
pub fn strength_to_clip_limit(strength: u32) -> f32 {
    let strength = strength.clamp(MIN_STRENGTH, MAX_STRENGTH);
    let fraction = (strength - MIN_STRENGTH) as f32 / (MAX_STRENGTH - MIN_STRENGTH) as f32;
    (MIN_CLIP_LIMIT + (MAX_CLIP_LIMIT - MIN_CLIP_LIMIT) * fraction)
        .clamp(MIN_CLIP_LIMIT, MAX_CLIP_LIMIT)
}
