//! Lowering passes for the Kiln buffer IR.
//!
//! # Module Organization
//!
//! - [`reduce_to_loops`] - lowers `buffer.reduce` and `buffer.reduce_window` to
//!   nested `loop.parallel` ops with a `loop.reduce` combinator
//! - [`config`] - lowering options, with environment fallbacks
//! - [`pass`] - the [`Pass`] trait and the [`PassManager`] pipeline
//! - [`registry`] - process-wide pass registry, looked up by pass name

pub mod config;
pub mod error;
pub mod pass;
pub mod reduce_to_loops;
pub mod registry;


pub use config::{BoundsCheck, LoweringConfig};
pub use error::{Error, Result};
pub use pass::{Pass, PassManager};
pub use reduce_to_loops::{
    LowerReduceToParallelLoops, MemoryBackedScalars, ReduceToParallelLoops, ReduceWindowToParallelLoops,
    ScalarConvention, register_reduce_lowering,
};
pub use registry::{PassRegistry, registry};
