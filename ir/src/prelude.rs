//! Common imports for building and rewriting functions.
//!
//! ```rust,ignore
//! use kiln_ir::prelude::*;
//! ```

pub use crate::builder::{Builder, IfConstruct, ParallelLoop, ReduceConstruct};
pub use crate::function::{BlockId, Function, OpId, ValueId};
pub use crate::op::{Op, OpFamily, OpKey, ReduceAttrs, ReduceWindowAttrs};
pub use crate::rewrite::{ConversionPattern, ConversionTarget, PatternSet, RewriteResult, Rewriter};
pub use crate::shape::{Dim, MemRefType, Type};
pub use crate::types::{BinaryOp, CmpPredicate, ConstValue};

pub use kiln_dtype::DType;
