//! The AltaLux filter: configuration, buffer validation and format dispatch.
//!
//! An [`AltaLuxFilter`] is built for one image size. Each `process_*` call
//! extracts the luma plane of a caller-owned buffer, runs CLAHE on it with the
//! configured [`Strategy`] and writes the result back in place.

mod pipeline;
mod sync;
mod types;

pub use types::{AltaLuxError, PixelFormat, Strategy};

use std::time::Instant;

use image::{GrayImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::grid::TileGrid;
use crate::histogram::tile_clip_limit;
use crate::luminance::{extract_luma, extract_packed_luma, inject_luma, inject_packed_luma};
use crate::{
    strength_to_clip_limit, FilterSettings, DEFAULT_REGIONS, DEFAULT_STRENGTH, MAX_STRENGTH,
    MIN_CLIP_LIMIT,
};

/// CLAHE filter bound to a fixed image size.
#[derive(Debug, Clone)]
pub struct AltaLuxFilter {
    grid: TileGrid,
    strategy: Strategy,
    strength: u32,
    clip_limit: f32,
    /// Luma plane for color formats; `None` while disabled or after a failed allocation.
    working: Option<Vec<u8>>,
}

impl AltaLuxFilter {
    /// Filter with the default tile grid, strength and strategy.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_slices(width, height, DEFAULT_REGIONS, DEFAULT_REGIONS)
    }

    /// Filter with a custom tile grid.
    pub fn with_slices(width: u32, height: u32, horizontal: u32, vertical: u32) -> Self {
        Self::with_strategy(Strategy::default(), width, height, horizontal, vertical)
    }

    /// Filter with an explicit run strategy.
    pub fn with_strategy(
        strategy: Strategy,
        width: u32,
        height: u32,
        horizontal: u32,
        vertical: u32,
    ) -> Self {
        let mut filter = Self {
            grid: TileGrid::new(width, height, horizontal, vertical),
            strategy,
            strength: 0,
            clip_limit: MIN_CLIP_LIMIT,
            working: None,
        };
        filter.set_strength(DEFAULT_STRENGTH);
        filter
    }

    /// Filter configured from persisted settings.
    pub fn from_settings(width: u32, height: u32, settings: &FilterSettings) -> Self {
        let mut filter = Self::with_strategy(
            settings.strategy,
            width,
            height,
            settings.horizontal_regions,
            settings.vertical_regions,
        );
        filter.set_strength(settings.strength);
        filter
    }

    /// Set the enhancement strength (0 to 100). 0 turns the filter into a no-op.
    ///
    /// Enabling the filter allocates the working buffer; disabling releases it.
    /// An allocation failure here is not fatal, it is retried on the next
    /// `process_*` call.
    pub fn set_strength(&mut self, strength: u32) {
        let clamped = strength.min(MAX_STRENGTH);
        if clamped != strength {
            warn!(requested = strength, clamped, "strength out of range");
        }
        self.strength = clamped;
        self.clip_limit = strength_to_clip_limit(clamped);

        if !self.is_enabled() {
            self.working = None;
        } else if self.working.is_none() {
            self.working = self.allocate_working().ok();
        }
    }

    /// Change the tile grid. Counts are clamped to the supported range.
    pub fn set_slices(&mut self, horizontal: u32, vertical: u32) {
        self.grid = TileGrid::new(self.width(), self.height(), horizontal, vertical);
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn strength(&self) -> u32 {
        self.strength
    }

    /// Clip fraction derived from the strength, in `[1.0, 5.0]`.
    pub fn clip_limit(&self) -> f32 {
        self.clip_limit
    }

    /// Bin cap applied to each tile histogram.
    pub fn region_clip_limit(&self) -> u32 {
        tile_clip_limit(self.clip_limit, self.grid.region_area())
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn width(&self) -> u32 {
        self.grid.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.grid.height() as u32
    }

    /// True unless the strength is 0.
    pub fn is_enabled(&self) -> bool {
        self.clip_limit > MIN_CLIP_LIMIT
    }

    /// Current configuration, for persisting.
    pub fn settings(&self) -> FilterSettings {
        FilterSettings {
            strength: self.strength,
            horizontal_regions: self.grid.horizontal_regions() as u32,
            vertical_regions: self.grid.vertical_regions() as u32,
            strategy: self.strategy,
        }
    }

    /// Enhance a buffer of the given format in place.
    ///
    /// The buffer must hold at least `width * height * bytes_per_pixel` bytes;
    /// anything past that is ignored. Nothing is written when an error is
    /// returned.
    pub fn process(&mut self, format: PixelFormat, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        let expected = self.grid.pixel_count() * format.bytes_per_pixel();
        validate_len(buffer.len(), expected)?;
        if !self.is_enabled() {
            return Ok(());
        }
        let buffer = &mut buffer[..expected];

        if format == PixelFormat::Gray {
            return self.run(buffer);
        }

        let mut working = self.take_working()?;
        let result = self.process_interleaved(format, buffer, &mut working);
        self.working = Some(working);
        result
    }

    /// 8-bit grayscale, processed directly in the caller's buffer.
    pub fn process_gray(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Gray, buffer)
    }

    pub fn process_rgb24(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Rgb24, buffer)
    }

    pub fn process_rgb32(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Rgb32, buffer)
    }

    pub fn process_bgr24(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Bgr24, buffer)
    }

    pub fn process_bgr32(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Bgr32, buffer)
    }

    pub fn process_yuyv(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Yuyv, buffer)
    }

    pub fn process_uyvy(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Uyvy, buffer)
    }

    pub fn process_yvyu(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Yvyu, buffer)
    }

    pub fn process_vyuy(&mut self, buffer: &mut [u8]) -> Result<(), AltaLuxError> {
        self.process(PixelFormat::Vyuy, buffer)
    }

    /// Enhance an `image` grayscale buffer of the filter's size.
    pub fn process_gray_image(&mut self, image: &mut GrayImage) -> Result<(), AltaLuxError> {
        self.check_dimensions(image.dimensions())?;
        self.process(PixelFormat::Gray, image)
    }

    /// Enhance an `image` RGB buffer of the filter's size.
    pub fn process_rgb_image(&mut self, image: &mut RgbImage) -> Result<(), AltaLuxError> {
        self.check_dimensions(image.dimensions())?;
        self.process(PixelFormat::Rgb24, image)
    }

    /// Enhance an `image` RGBA buffer of the filter's size. Alpha is preserved.
    pub fn process_rgba_image(&mut self, image: &mut RgbaImage) -> Result<(), AltaLuxError> {
        self.check_dimensions(image.dimensions())?;
        self.process(PixelFormat::Rgb32, image)
    }

    /// Run CLAHE on a single-channel plane of the filter's size.
    ///
    /// Returns without touching the plane when the filter is disabled or the
    /// image is smaller than the tile grid.
    pub fn run(&self, luma: &mut [u8]) -> Result<(), AltaLuxError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let expected = self.grid.pixel_count();
        validate_len(luma.len(), expected)?;

        let grid = &self.grid;
        if grid.is_degenerate() {
            debug!(
                width = grid.width(),
                height = grid.height(),
                "image smaller than tile grid, skipping"
            );
            return Ok(());
        }

        let clip_limit = self.region_clip_limit();
        let started = start_clock();
        pipeline::run_strategy(self.strategy, grid, &mut luma[..expected], clip_limit)?;

        debug!(
            strategy = self.strategy.name(),
            width = grid.width(),
            height = grid.height(),
            horizontal_regions = grid.horizontal_regions(),
            vertical_regions = grid.vertical_regions(),
            clip_limit,
            elapsed_us = started.map(|started| started.elapsed().as_micros() as u64),
            "contrast enhancement complete"
        );
        Ok(())
    }

    /// Round-trip a color or packed YUV buffer through the luma plane.
    fn process_interleaved(
        &self,
        format: PixelFormat,
        buffer: &mut [u8],
        working: &mut [u8],
    ) -> Result<(), AltaLuxError> {
        if let Some(layout) = format.color_layout() {
            extract_luma(buffer, layout, working);
            self.run(working)?;
            inject_luma(buffer, layout, working);
        } else if let Some(order) = format.yuv_order() {
            extract_packed_luma(buffer, order, working);
            self.run(working)?;
            inject_packed_luma(buffer, order, working);
        }
        Ok(())
    }

    fn check_dimensions(&self, actual: (u32, u32)) -> Result<(), AltaLuxError> {
        let expected = (self.width(), self.height());
        if actual != expected {
            return Err(AltaLuxError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }

    fn take_working(&mut self) -> Result<Vec<u8>, AltaLuxError> {
        match self.working.take() {
            Some(working) => Ok(working),
            None => self.allocate_working(),
        }
    }

    fn allocate_working(&self) -> Result<Vec<u8>, AltaLuxError> {
        let len = self.grid.pixel_count();
        let mut working = Vec::new();
        working.try_reserve_exact(len).map_err(|_| {
            warn!(bytes = len, "working buffer allocation failed");
            AltaLuxError::OutOfMemory
        })?;
        working.resize(len, 0);
        Ok(working)
    }
}

/// Run timer; `Instant::now` panics on wasm32 without a host clock.
#[cfg(not(target_arch = "wasm32"))]
fn start_clock() -> Option<Instant> {
    Some(Instant::now())
}

#[cfg(target_arch = "wasm32")]
fn start_clock() -> Option<Instant> {
    None
}

fn validate_len(actual: usize, expected: usize) -> Result<(), AltaLuxError> {
    if actual == 0 {
        return Err(AltaLuxError::NullImage);
    }
    if actual < expected {
        return Err(AltaLuxError::BufferTooSmall { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{clip_histogram, tile_histogram};
    use crate::MIN_STRENGTH;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_buffer(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buffer = vec![0u8; len];
        rng.fill(buffer.as_mut_slice());
        buffer
    }

    #[test]
    fn test_all_strategies_identical_on_rgb32() {
        let (width, height) = (1024, 768);
        let input = random_buffer(width as usize * height as usize * 4, 0x5555);

        let mut outputs = Vec::new();
        for strategy in Strategy::ALL {
            let mut filter = AltaLuxFilter::with_strategy(strategy, width, height, 8, 8);
            assert_eq!(filter.strength(), DEFAULT_STRENGTH);
            let mut buffer = input.clone();
            filter.process_rgb32(&mut buffer).unwrap();
            outputs.push(buffer);
        }

        assert_ne!(outputs[0], input, "filter should change the image");
        for (strategy, output) in Strategy::ALL.iter().zip(&outputs).skip(1) {
            assert!(output == &outputs[0], "{strategy:?} differs from serial");
        }
    }

    #[test]
    fn test_run_clock_matches_target() {
        assert_eq!(start_clock().is_some(), !cfg!(target_arch = "wasm32"));
    }

    #[test]
    fn test_alpha_untouched() {
        let input = random_buffer(64 * 48 * 4, 3);
        let mut buffer = input.clone();
        AltaLuxFilter::new(64, 48).process_rgb32(&mut buffer).unwrap();
        for (out, original) in buffer.chunks_exact(4).zip(input.chunks_exact(4)) {
            assert_eq!(out[3], original[3]);
        }
    }

    #[test]
    fn test_strength_zero_is_pass_through() {
        let input = random_buffer(64 * 64 * 3, 1);
        let mut buffer = input.clone();
        let mut filter = AltaLuxFilter::new(64, 64);
        filter.set_strength(MIN_STRENGTH);

        assert!(!filter.is_enabled());
        assert!(filter.working.is_none());
        filter.process_rgb24(&mut buffer).unwrap();
        assert_eq!(buffer, input);
    }

    #[test]
    fn test_reenabling_allocates_working_buffer() {
        let mut filter = AltaLuxFilter::new(32, 32);
        assert!(filter.working.is_some());
        filter.set_strength(0);
        assert!(filter.working.is_none());
        filter.set_strength(40);
        assert_eq!(filter.working.as_ref().map(Vec::len), Some(32 * 32));
    }

    #[test]
    fn test_full_strength_small_grid_clips() {
        let input = random_buffer(16 * 16, 9);
        let mut filter = AltaLuxFilter::with_slices(16, 16, 2, 2);
        filter.set_strength(100);

        let cap = filter.region_clip_limit();
        assert!(cap >= 1);
        for (tx, ty) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let (x, y) = filter.grid().tile_origin(tx, ty);
            let mut histogram = tile_histogram(&input, 16, x, y, 8, 8);
            clip_histogram(&mut histogram, cap);
            assert!(histogram.iter().all(|&bin| bin <= cap));
            assert_eq!(histogram.iter().sum::<u32>(), 64);
        }

        let mut buffer = input.clone();
        filter.process_gray(&mut buffer).unwrap();
        assert_ne!(buffer, input);
    }

    #[test]
    fn test_gray_matches_run() {
        let input = random_buffer(80 * 60, 5);
        let mut filter = AltaLuxFilter::with_slices(80, 60, 4, 3);

        let mut via_process = input.clone();
        filter.process_gray(&mut via_process).unwrap();
        let mut via_run = input.clone();
        filter.run(&mut via_run).unwrap();
        assert_eq!(via_process, via_run);
    }

    #[test]
    fn test_bgr_mirrors_rgb() {
        let rgb = random_buffer(48 * 32 * 3, 21);
        let mut bgr = rgb.clone();
        for pixel in bgr.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }

        let mut filter = AltaLuxFilter::new(48, 32);
        let mut rgb_out = rgb.clone();
        filter.process_rgb24(&mut rgb_out).unwrap();
        filter.process_bgr24(&mut bgr).unwrap();

        for pixel in bgr.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        assert_eq!(bgr, rgb_out);
    }

    #[test]
    fn test_packed_yuv_changes_luma_only() {
        let (width, height) = (32u32, 24u32);
        let input = random_buffer((width * height * 2) as usize, 17);
        let mut filter = AltaLuxFilter::new(width, height);

        for (format, luma_offset) in [
            (PixelFormat::Yuyv, 0),
            (PixelFormat::Yvyu, 0),
            (PixelFormat::Uyvy, 1),
            (PixelFormat::Vyuy, 1),
        ] {
            let mut buffer = input.clone();
            filter.process(format, &mut buffer).unwrap();

            let mut plane: Vec<u8> = input.iter().skip(luma_offset).step_by(2).copied().collect();
            filter.run(&mut plane).unwrap();

            for (index, (out, original)) in buffer.iter().zip(&input).enumerate() {
                if index % 2 == luma_offset {
                    assert_eq!(*out, plane[index / 2], "{format:?} luma at {index}");
                } else {
                    assert_eq!(out, original, "{format:?} chroma at {index}");
                }
            }
        }
    }

    #[test]
    fn test_extra_trailing_bytes_ignored() {
        let mut buffer = random_buffer(16 * 16 + 5, 2);
        let tail = buffer[256..].to_vec();
        AltaLuxFilter::new(16, 16).process_gray(&mut buffer).unwrap();
        assert_eq!(&buffer[256..], tail.as_slice());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let mut filter = AltaLuxFilter::new(16, 16);
        assert_eq!(filter.process_rgb24(&mut []), Err(AltaLuxError::NullImage));
        filter.set_strength(0);
        assert_eq!(filter.process_gray(&mut []), Err(AltaLuxError::NullImage));
    }

    #[test]
    fn test_short_buffer_rejected_untouched() {
        let mut filter = AltaLuxFilter::new(16, 16);
        let mut buffer = vec![7u8; 16 * 16 * 3 - 1];
        assert_eq!(
            filter.process_rgb24(&mut buffer),
            Err(AltaLuxError::BufferTooSmall {
                expected: 768,
                actual: 767
            })
        );
        assert!(buffer.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_image_dimension_mismatch() {
        let mut filter = AltaLuxFilter::new(16, 16);
        let mut image = RgbImage::new(16, 8);
        assert_eq!(
            filter.process_rgb_image(&mut image),
            Err(AltaLuxError::DimensionMismatch {
                expected: (16, 16),
                actual: (16, 8)
            })
        );
    }

    #[test]
    fn test_image_buffers() {
        let mut filter = AltaLuxFilter::new(40, 30);
        let raw = random_buffer(40 * 30 * 4, 8);

        let mut rgba = RgbaImage::from_raw(40, 30, raw.clone()).unwrap();
        filter.process_rgba_image(&mut rgba).unwrap();
        let mut expected = raw.clone();
        filter.process_rgb32(&mut expected).unwrap();
        assert_eq!(rgba.as_raw(), &expected);

        let mut gray = GrayImage::from_raw(40, 30, raw[..1200].to_vec()).unwrap();
        filter.process_gray_image(&mut gray).unwrap();
        assert_ne!(gray.as_raw().as_slice(), &raw[..1200]);
    }

    #[test]
    fn test_image_smaller_than_grid_is_untouched() {
        let input = random_buffer(5 * 5, 4);
        let mut buffer = input.clone();
        let mut filter = AltaLuxFilter::new(5, 5);
        assert!(filter.grid().is_degenerate());
        filter.process_gray(&mut buffer).unwrap();
        assert_eq!(buffer, input);
    }

    #[test]
    fn test_strength_is_clamped() {
        let mut filter = AltaLuxFilter::new(16, 16);
        filter.set_strength(500);
        assert_eq!(filter.strength(), MAX_STRENGTH);
        assert_eq!(filter.clip_limit(), crate::MAX_CLIP_LIMIT);
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = FilterSettings {
            strength: 60,
            horizontal_regions: 4,
            vertical_regions: 12,
            strategy: Strategy::ParallelEvent,
        };
        let filter = AltaLuxFilter::from_settings(320, 240, &settings);
        assert_eq!(filter.settings(), settings);
        assert_eq!(filter.grid().region_width(), 80);
        assert_eq!(filter.grid().region_height(), 20);
    }

    #[test]
    fn test_set_slices_clamps_and_keeps_size() {
        let mut filter = AltaLuxFilter::new(200, 100);
        filter.set_slices(1, 30);
        assert_eq!(filter.grid().horizontal_regions(), 2);
        assert_eq!(filter.grid().vertical_regions(), 16);
        assert_eq!((filter.width(), filter.height()), (200, 100));
    }

    #[test]
    fn test_set_strategy() {
        let mut filter = AltaLuxFilter::new(16, 16);
        assert_eq!(filter.strategy(), Strategy::ParallelSplitLoop);
        filter.set_strategy(Strategy::from_id(5));
        assert_eq!(filter.strategy(), Strategy::ParallelActiveWait);
    }
}
