//! Conversions between JavaScript-friendly values and core types.

use altalux_core::{AltaLuxError, Strategy};
use wasm_bindgen::JsValue;

/// Convert a u8 strategy value to the core Strategy enum.
///
/// Values:
/// - 1 = Serial
/// - 2 = Parallel split loop (default)
/// - 4 = Parallel event
/// - 5 = Parallel active wait
///
/// Any other value selects the default.
pub(crate) fn strategy_from_u8(value: u8) -> Strategy {
    Strategy::from_id(value as u32)
}

/// Numeric id of a strategy, as accepted by [`strategy_from_u8`].
pub(crate) fn strategy_to_u8(strategy: Strategy) -> u8 {
    strategy.id() as u8
}

/// Turn a filter error into a JS exception value carrying its message.
pub(crate) fn to_js_error(error: AltaLuxError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
