//! Lowering of buffer reductions to parallel loops.
//!
//! `buffer.reduce` and `buffer.reduce_window` are rewritten into two nested
//! `loop.parallel` ops: the outer one walks the output, the inner one walks the
//! reduced axes (or the window) and carries the accumulator, seeded with the init
//! value. The per-element combination happens in a `loop.reduce` whose body is the
//! original reduction body, transplanted from buffer cells to scalar values.
//!
//! - [`bounds`] - loop extents (static constants or run-time `memory.dim` queries)
//!   and in-bounds predicates
//! - [`operands`] - operand type checks shared by both patterns
//! - [`partition`] - kept/reduced axis split and coordinate interleaving
//! - [`transplant`] - body transplanting and the scalar calling convention
//! - [`reduce`] / [`reduce_window`] - the conversion patterns
//! - [`pass`] - the pass wiring both patterns into a partial conversion

pub mod bounds;
pub mod operands;
pub mod partition;
pub mod pass;
pub mod reduce;
pub mod reduce_window;
pub mod transplant;

pub use pass::{LowerReduceToParallelLoops, PASS_DESCRIPTION, PASS_NAME, register_reduce_lowering};
pub use reduce::ReduceToParallelLoops;
pub use reduce_window::ReduceWindowToParallelLoops;
pub use transplant::{MemoryBackedScalars, ScalarConvention};

pub(crate) use pass::register_into;
