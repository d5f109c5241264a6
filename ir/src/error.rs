use kiln_dtype::DType;
use snafu::Snafu;

use crate::function::{OpId, ValueId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // ========================================================================
    // Construction
    // ========================================================================
    /// Operation was erased and can no longer be accessed.
    #[snafu(display("operation {op} was erased"))]
    OpErased { op: OpId },

    /// Operation is not attached to any block.
    #[snafu(display("operation {op} is detached from its block"))]
    OpDetached { op: OpId },

    /// Erasing would leave dangling uses of the op's results.
    #[snafu(display("cannot erase '{op_name}': its results still have {uses} use(s)"))]
    EraseWithUses { op_name: &'static str, uses: usize },

    /// Value does not have the expected type category.
    #[snafu(display("value {value} has type {actual}, expected {expected}"))]
    UnexpectedType { value: ValueId, expected: &'static str, actual: String },

    // ========================================================================
    // Verification
    // ========================================================================
    /// Structural verification failure.
    #[snafu(display("'{op_name}' ({op}) failed to verify: {message}"))]
    Verification { op: OpId, op_name: &'static str, message: String },

    // ========================================================================
    // Conversion
    // ========================================================================
    /// Partial conversion left illegal operations behind.
    #[snafu(display("failed to legalize operation '{op_name}' ({unconverted} illegal op(s) remain)"))]
    LegalizationFailed { op_name: &'static str, unconverted: usize },

    /// Pattern reported success but left its root alive.
    #[snafu(display("pattern '{pattern}' reported a rewrite but did not replace or erase its root"))]
    RootNotReplaced { pattern: &'static str },

    // ========================================================================
    // Interpretation
    // ========================================================================
    /// Wrong number of function arguments.
    #[snafu(display("expected {expected} argument buffer(s), got {actual}"))]
    ArgumentCount { expected: usize, actual: usize },

    /// Argument buffer does not match the declared memref type.
    #[snafu(display("argument {index} has shape {actual:?} and dtype {actual_dtype}, expected {expected}"))]
    ArgumentMismatch { index: usize, expected: String, actual: Vec<usize>, actual_dtype: DType },

    /// Host buffer data length differs from the shape.
    #[snafu(display("buffer of shape {shape:?} needs {expected} element(s), got {actual}"))]
    BufferSizeMismatch { shape: Vec<usize>, expected: usize, actual: usize },

    /// Buffer access outside its shape.
    #[snafu(display("index {indices:?} out of bounds for shape {shape:?}"))]
    IndexOutOfBounds { indices: Vec<i64>, shape: Vec<usize> },

    /// Value used before it was computed.
    #[snafu(display("value {value} is not bound"))]
    UnboundValue { value: ValueId },

    /// Scalar expected, buffer found (or vice versa).
    #[snafu(display("value {value} is not a {expected}"))]
    ValueKind { value: ValueId, expected: &'static str },

    /// Scalar evaluation is undefined for these operands.
    #[snafu(display("cannot evaluate '{op_name}' on {dtype} operands"))]
    InvalidOperands { op_name: &'static str, dtype: DType },

    /// `Reduce` executed outside of a `Parallel` body.
    #[snafu(display("'loop.reduce' ({op}) executed outside of a parallel loop"))]
    ReduceOutsideParallel { op: OpId },

    /// Allocation of a buffer with run-time extents.
    #[snafu(display("cannot allocate buffer of dynamic type {ty}"))]
    DynamicAlloc { ty: String },

    /// Operation the interpreter does not execute in this form.
    #[snafu(display("interpreter does not support '{op_name}': {reason}"))]
    Unsupported { op_name: &'static str, reason: String },
}
