//! Buffer IR for the Kiln compiler.
//!
//! A small region-based SSA IR over scalars and shaped buffers, with the pieces a
//! lowering pass needs around it.
//!
//! # Module Organization
//!
//! - [`types`] - scalar constants, binary operators, comparison predicates
//! - [`shape`] - extents, memref and value types
//! - [`op`] - the operation enum and its payload-free [`OpKey`]
//! - [`function`] - arena holding ops, blocks, regions and values
//! - [`builder`] - op construction at an insertion point, deep cloning
//! - [`mapping`] - value/block remapping for clones
//! - [`verify`] - structural verification
//! - [`diagnostic`] - op-attached errors, warnings and remarks
//! - [`rewrite`] - conversion targets, patterns and the partial conversion driver
//! - [`eval`] / [`interp`] - scalar evaluation and the reference interpreter
//! - [`error`] - error types and result handling

pub mod builder;
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod function;
pub mod interp;
pub mod mapping;
pub mod op;
pub mod prelude;
pub mod rewrite;
pub mod shape;
pub mod tree;
pub mod types;
pub mod verify;

#[cfg(any(test, feature = "proptest"))]
pub mod test;

pub use builder::{Builder, IfConstruct, InsertPoint, ParallelLoop, ReduceConstruct};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use function::{BlockId, Function, OpId, Operation, RegionId, ValueDef, ValueId};
pub use interp::{HostBuffer, Interpreter};
pub use mapping::IrMapping;
pub use op::{Op, OpFamily, OpKey, ReduceAttrs, ReduceWindowAttrs};
pub use shape::{Dim, MemRefType, Shape, Type};
pub use types::{BinaryOp, CmpPredicate, ConstValue};
pub use verify::verify;

pub use kiln_dtype::DType;
