//! AltaLux filter WASM bindings.
//!
//! Pixel buffers passed from JavaScript as `Uint8Array` are copied into WASM
//! memory, enhanced in place and copied back when the call returns.

use altalux_core::{AltaLuxError, AltaLuxFilter, FilterSettings, PixelFormat};
use wasm_bindgen::prelude::*;

use crate::types::{strategy_from_u8, strategy_to_u8, to_js_error};

/// CLAHE filter for a fixed image size.
#[wasm_bindgen]
pub struct JsAltaLuxFilter {
    inner: AltaLuxFilter,
}

#[wasm_bindgen]
impl JsAltaLuxFilter {
    /// Create a filter with default strength (25) and strategy.
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `horizontal` - Tiles across (clamped to 2..=16)
    /// * `vertical` - Tiles down (clamped to 2..=16)
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, horizontal: u32, vertical: u32) -> JsAltaLuxFilter {
        Self {
            inner: AltaLuxFilter::with_slices(width, height, horizontal, vertical),
        }
    }

    /// Create a filter from a settings object
    /// (`{ strength, horizontal_regions, vertical_regions, strategy }`).
    /// Missing fields take their defaults.
    pub fn from_settings(
        width: u32,
        height: u32,
        settings: JsValue,
    ) -> Result<JsAltaLuxFilter, JsValue> {
        let settings: FilterSettings = serde_wasm_bindgen::from_value(settings)
            .map_err(|e| JsValue::from_str(&format!("Invalid filter settings: {}", e)))?;
        Ok(Self {
            inner: AltaLuxFilter::from_settings(width, height, &settings),
        })
    }

    /// Serialize the current settings for storage
    pub fn settings(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.settings())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Get the image width
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Get the image height
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Get the strength (0 to 100)
    #[wasm_bindgen(getter)]
    pub fn strength(&self) -> u32 {
        self.inner.strength()
    }

    /// Set the strength (0 to 100, 0 disables the filter)
    pub fn set_strength(&mut self, strength: u32) {
        self.inner.set_strength(strength);
    }

    /// Change the tile grid
    pub fn set_slices(&mut self, horizontal: u32, vertical: u32) {
        self.inner.set_slices(horizontal, vertical);
    }

    /// Get the strategy id (1 serial, 2 split loop, 4 event, 5 active wait)
    #[wasm_bindgen(getter)]
    pub fn strategy(&self) -> u8 {
        strategy_to_u8(self.inner.strategy())
    }

    /// Set the strategy by id; unknown ids select the default
    pub fn set_strategy(&mut self, strategy: u8) {
        self.inner.set_strategy(strategy_from_u8(strategy));
    }

    /// Check whether processing changes images (strength above 0)
    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Enhance RGBA pixels (4 bytes per pixel, canvas ImageData layout). Alpha is kept.
    pub fn process_rgba(&mut self, pixels: &mut [u8]) -> Result<(), JsValue> {
        self.process_format(PixelFormat::Rgb32, pixels)
            .map_err(to_js_error)
    }

    /// Enhance RGB pixels (3 bytes per pixel).
    pub fn process_rgb(&mut self, pixels: &mut [u8]) -> Result<(), JsValue> {
        self.process_format(PixelFormat::Rgb24, pixels)
            .map_err(to_js_error)
    }

    /// Enhance 8-bit grayscale pixels.
    pub fn process_gray(&mut self, pixels: &mut [u8]) -> Result<(), JsValue> {
        self.process_format(PixelFormat::Gray, pixels)
            .map_err(to_js_error)
    }
}

impl JsAltaLuxFilter {
    fn process_format(
        &mut self,
        format: PixelFormat,
        pixels: &mut [u8],
    ) -> Result<(), AltaLuxError> {
        self.inner.process(format, pixels)
    }
}
