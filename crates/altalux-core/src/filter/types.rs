//! Core types for the filter front end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::luminance::{ColorLayout, YuvOrder};

/// Error types for filter operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AltaLuxError {
    /// The image buffer is empty.
    #[error("Image buffer is empty")]
    NullImage,

    /// The image buffer is shorter than the configured dimensions require.
    #[error("Image buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    /// An image's dimensions differ from the filter's.
    #[error("Image is {}x{}, filter expects {}x{}", actual.0, actual.1, expected.0, expected.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Working buffers could not be allocated.
    #[error("Out of memory allocating filter buffers")]
    OutOfMemory,
}

impl AltaLuxError {
    /// Numeric status code for hosts that speak integer results (0 is success).
    pub fn status_code(&self) -> i32 {
        match self {
            AltaLuxError::NullImage => -1,
            // -3 and -4 mean width/height not a multiple of the tile count,
            // which the clamped grid never reports
            AltaLuxError::BufferTooSmall { .. } => -5,
            AltaLuxError::DimensionMismatch { .. } => -6,
            AltaLuxError::OutOfMemory => -11,
        }
    }
}

/// How the histogram and interpolation phases are scheduled.
///
/// Every strategy produces the same bytes; they only differ in speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Single thread, one tile row at a time.
    Serial,
    /// All histograms in parallel, barrier, then all interpolation in parallel.
    #[default]
    ParallelSplitLoop,
    /// One thread per tile row; interpolation blocks on per-row condition variables.
    ParallelEvent,
    /// One thread per tile row; interpolation spins on per-row atomic counters.
    ParallelActiveWait,
}

impl Strategy {
    /// All strategies, serial first.
    pub const ALL: [Strategy; 4] = [
        Strategy::Serial,
        Strategy::ParallelSplitLoop,
        Strategy::ParallelEvent,
        Strategy::ParallelActiveWait,
    ];

    /// Look up a strategy by its numeric identifier.
    ///
    /// 1 = serial, 2 = split loop, 4 = event, 5 = active wait. Anything else,
    /// including 0, selects the default.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Strategy::Serial,
            2 => Strategy::ParallelSplitLoop,
            4 => Strategy::ParallelEvent,
            5 => Strategy::ParallelActiveWait,
            _ => Strategy::default(),
        }
    }

    /// Numeric identifier accepted by [`Strategy::from_id`].
    pub fn id(self) -> u32 {
        match self {
            Strategy::Serial => 1,
            Strategy::ParallelSplitLoop => 2,
            Strategy::ParallelEvent => 4,
            Strategy::ParallelActiveWait => 5,
        }
    }

    /// Human-readable name, used in logs and benchmark ids.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Serial => "serial",
            Strategy::ParallelSplitLoop => "parallel-split-loop",
            Strategy::ParallelEvent => "parallel-event",
            Strategy::ParallelActiveWait => "parallel-active-wait",
        }
    }
}

/// Interleaved 8-bit pixel formats accepted by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// One luma byte per pixel
    Gray,
    Rgb24,
    /// RGB plus an untouched fourth byte
    Rgb32,
    Bgr24,
    /// BGR plus an untouched fourth byte
    Bgr32,
    /// Packed 4:2:2, Y0 U Y1 V
    Yuyv,
    /// Packed 4:2:2, U Y0 V Y1
    Uyvy,
    /// Packed 4:2:2, Y0 V Y1 U
    Yvyu,
    /// Packed 4:2:2, V Y0 U Y1
    Vyuy,
}

impl PixelFormat {
    /// Bytes per pixel (packed YUV averages two bytes per pixel).
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Yuyv | PixelFormat::Uyvy | PixelFormat::Yvyu | PixelFormat::Vyuy => 2,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgb32 | PixelFormat::Bgr32 => 4,
        }
    }

    /// Layout for the color formats, `None` otherwise.
    pub fn color_layout(self) -> Option<ColorLayout> {
        match self {
            PixelFormat::Rgb24 => Some(ColorLayout::RGB24),
            PixelFormat::Rgb32 => Some(ColorLayout::RGB32),
            PixelFormat::Bgr24 => Some(ColorLayout::BGR24),
            PixelFormat::Bgr32 => Some(ColorLayout::BGR32),
            _ => None,
        }
    }

    /// Luma position for the packed YUV formats, `None` otherwise.
    pub fn yuv_order(self) -> Option<YuvOrder> {
        match self {
            PixelFormat::Yuyv | PixelFormat::Yvyu => Some(YuvOrder::LumaFirst),
            PixelFormat::Uyvy | PixelFormat::Vyuy => Some(YuvOrder::ChromaFirst),
            _ => None,
        }
    }
}
