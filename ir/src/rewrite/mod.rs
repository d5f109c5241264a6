//! Conversion-driven rewriting.
//!
//! A [`ConversionTarget`] declares which ops are legal, a [`PatternSet`] holds the
//! [`ConversionPattern`]s that turn illegal ops into legal IR, and
//! [`apply_partial_conversion`] drives the patterns until no illegal op remains or
//! an illegal op cannot be converted.

mod engine;
mod pattern;
mod rewriter;
mod target;

pub use engine::{ConversionStats, apply_partial_conversion};
pub use pattern::{ConversionPattern, PatternSet, RewriteResult};
pub use rewriter::Rewriter;
pub use target::{ConversionTarget, Legality};
