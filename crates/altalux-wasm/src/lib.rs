//! AltaLux WASM - WebAssembly bindings for the AltaLux contrast filter
//!
//! This crate exposes the altalux-core CLAHE filter to JavaScript/TypeScript
//! applications.
//!
//! # Module Structure
//!
//! - `filter` - The `JsAltaLuxFilter` wrapper and its processing entry points
//! - `types` - Conversions between JS-friendly values and core types
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsAltaLuxFilter } from '@altalux/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const data = ctx.getImageData(0, 0, canvas.width, canvas.height);
//! const filter = new JsAltaLuxFilter(data.width, data.height, 8, 8);
//! filter.set_strength(40);
//! filter.process_rgba(data.data);
//! ctx.putImageData(data, 0, 0);
//! ```

use wasm_bindgen::prelude::*;

mod filter;
mod types;

// Re-export public types
pub use filter::JsAltaLuxFilter;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
