//! Lowering configuration.
//!
//! Typed options with bon builders and environment variable fallbacks.

use std::str::FromStr;

use bon::bon;
use tracing::warn;

/// How a window element's operand index is checked against the operand extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BoundsCheck {
    /// One `ult` comparison on the 64-bit index type. Negative indices wrap to huge
    /// unsigned values and fail the same test as indices past the end.
    #[default]
    #[strum(serialize = "unsigned")]
    UnsignedWrap,

    /// `index >= 0 && index < extent` with signed comparisons.
    #[strum(serialize = "signed")]
    SignedRange,
}

/// Options of the reduce-to-parallel-loops lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringConfig {
    pub bounds_check: BoundsCheck,

    /// Lower `buffer.reduce_window` ops missing strides or padding with unit
    /// strides and zero padding (plus a warning) instead of rejecting them.
    pub lenient_window_attrs: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[bon]
impl LoweringConfig {
    #[builder]
    pub fn new(#[builder(default)] bounds_check: BoundsCheck, #[builder(default = false)] lenient_window_attrs: bool) -> Self {
        Self { bounds_check, lenient_window_attrs }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_BOUNDS_CHECK` - `unsigned` (default) or `signed`
    /// * `KILN_LENIENT_WINDOW_ATTRS` - accept windows without strides/padding if set
    pub fn from_env() -> Self {
        let bounds_check = match std::env::var("KILN_BOUNDS_CHECK") {
            Ok(value) => BoundsCheck::from_str(value.trim()).unwrap_or_else(|_| {
                warn!(value = %value, "unrecognized KILN_BOUNDS_CHECK, using the default");
                BoundsCheck::default()
            }),
            Err(_) => BoundsCheck::default(),
        };
        let lenient_window_attrs = std::env::var("KILN_LENIENT_WINDOW_ATTRS").is_ok();

        Self { bounds_check, lenient_window_attrs }
    }
}
