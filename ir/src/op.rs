//! Operation definitions for the buffer IR.
//!
//! Operand layout is positional and documented per variant. Typed accessors that
//! split operand lists into segments live on [`Function`](crate::Function).

use smallvec::SmallVec;

use crate::types::{BinaryOp, CmpPredicate, ConstValue};

/// Operation families. Conversion targets declare legality per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum OpFamily {
    /// Scalar arithmetic and comparisons.
    Arith,
    /// Buffer allocation, size queries, loads and stores.
    Memory,
    /// Parallel loops, reductions and conditionals.
    Loop,
    /// High-level buffer-to-buffer operations.
    Buffer,
    /// Function-level terminator.
    Func,
}

/// Attributes of a plain buffer reduction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReduceAttrs {
    /// Reduced axes of the operand, in any order.
    pub dimensions: SmallVec<[usize; 4]>,
    /// Number of input buffers. Operands are `[inputs.., inits.., outs..]`, each of this length.
    pub num_inputs: usize,
}

impl ReduceAttrs {
    pub fn new(dimensions: impl IntoIterator<Item = usize>) -> Self {
        Self { dimensions: dimensions.into_iter().collect(), num_inputs: 1 }
    }
}

/// Attributes of a windowed buffer reduction.
///
/// Optional attributes follow the usual XLA defaults when interpreted: stride 1,
/// zero padding, dilation 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ReduceWindowAttrs {
    pub window_dimensions: SmallVec<[usize; 4]>,
    pub window_strides: Option<SmallVec<[usize; 4]>>,
    /// `(low, high)` padding per axis.
    pub padding: Option<SmallVec<[(i64, i64); 4]>>,
    pub base_dilations: Option<SmallVec<[usize; 4]>>,
    pub window_dilations: Option<SmallVec<[usize; 4]>>,
}

impl ReduceWindowAttrs {
    pub fn new(window_dimensions: impl IntoIterator<Item = usize>) -> Self {
        Self { window_dimensions: window_dimensions.into_iter().collect(), ..Default::default() }
    }

    pub fn with_strides(mut self, strides: impl IntoIterator<Item = usize>) -> Self {
        self.window_strides = Some(strides.into_iter().collect());
        self
    }

    pub fn with_padding(mut self, padding: impl IntoIterator<Item = (i64, i64)>) -> Self {
        self.padding = Some(padding.into_iter().collect());
        self
    }

    pub fn with_base_dilations(mut self, dilations: impl IntoIterator<Item = usize>) -> Self {
        self.base_dilations = Some(dilations.into_iter().collect());
        self
    }

    pub fn with_window_dilations(mut self, dilations: impl IntoIterator<Item = usize>) -> Self {
        self.window_dilations = Some(dilations.into_iter().collect());
        self
    }

    /// True when any dilation attribute is present.
    pub fn has_dilations(&self) -> bool {
        self.base_dilations.is_some() || self.window_dilations.is_some()
    }
}

/// IR operation.
///
/// `OpKey` is the payload-free discriminant used for pattern indexing and legality.
#[derive(Debug, Clone, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(OpKey), derive(Hash, PartialOrd, Ord, strum::VariantArray))]
pub enum Op {
    // Arith
    /// Scalar constant. No operands, one result.
    Const(ConstValue),
    /// `(lhs, rhs) -> result`, both operands of the result type.
    Binary(BinaryOp),
    /// `(lhs, rhs) -> i1`.
    Cmp(CmpPredicate),
    /// `(cond, on_true, on_false) -> result`.
    Select,

    // Memory
    /// `(memref) -> index`: run-time extent of `axis`.
    Dim { axis: usize },
    /// `() -> memref`: fresh buffer of the result type.
    Alloc,
    /// `(memref, indices..) -> element`.
    Load,
    /// `(value, memref, indices..)`.
    Store,

    // Loop
    /// `(lbs.., ubs.., steps.., inits..) -> results`, one result per init.
    ///
    /// The body block takes the induction variables and ends with `Yield`.
    Parallel { num_loops: usize },
    /// `(element)`. Region block takes `(element, accumulator)` and ends with `ReduceReturn`.
    ///
    /// Must be nested directly in a `Parallel` body; the k-th `Reduce` feeds the k-th result.
    Reduce,
    /// `(value)`: combined accumulator.
    ReduceReturn,
    /// `(cond) -> results`: then and else regions, each ending in `Yield`.
    If,
    /// `(values..)`.
    Yield,

    // Buffer
    /// `(inputs.., inits.., outs..)`, one region with a body over rank-0 memrefs.
    BufferReduce(ReduceAttrs),
    /// `(operand, init, out)`, one region with a body over rank-0 memrefs.
    BufferReduceWindow(ReduceWindowAttrs),
    /// `(lhs, rhs, out)` elementwise over buffers of equal shape.
    BufferBinary(BinaryOp),
    /// Terminator of buffer op bodies.
    BufferTerminator,

    // Func
    /// Function terminator.
    Return,
}

impl Op {
    pub fn key(&self) -> OpKey {
        OpKey::from(self)
    }

    pub fn name(&self) -> &'static str {
        self.key().name()
    }

    pub fn family(&self) -> OpFamily {
        self.key().family()
    }

    pub fn is_terminator(&self) -> bool {
        self.key().is_terminator()
    }
}

impl OpKey {
    /// Printed operation name (`family.op`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Const => "arith.constant",
            Self::Binary => "arith.binary",
            Self::Cmp => "arith.cmp",
            Self::Select => "arith.select",
            Self::Dim => "memory.dim",
            Self::Alloc => "memory.alloc",
            Self::Load => "memory.load",
            Self::Store => "memory.store",
            Self::Parallel => "loop.parallel",
            Self::Reduce => "loop.reduce",
            Self::ReduceReturn => "loop.reduce_return",
            Self::If => "loop.if",
            Self::Yield => "loop.yield",
            Self::BufferReduce => "buffer.reduce",
            Self::BufferReduceWindow => "buffer.reduce_window",
            Self::BufferBinary => "buffer.binary",
            Self::BufferTerminator => "buffer.terminator",
            Self::Return => "func.return",
        }
    }

    pub const fn family(self) -> OpFamily {
        match self {
            Self::Const | Self::Binary | Self::Cmp | Self::Select => OpFamily::Arith,
            Self::Dim | Self::Alloc | Self::Load | Self::Store => OpFamily::Memory,
            Self::Parallel | Self::Reduce | Self::ReduceReturn | Self::If | Self::Yield => OpFamily::Loop,
            Self::BufferReduce | Self::BufferReduceWindow | Self::BufferBinary | Self::BufferTerminator => {
                OpFamily::Buffer
            }
            Self::Return => OpFamily::Func,
        }
    }

    pub const fn is_terminator(self) -> bool {
        matches!(self, Self::ReduceReturn | Self::Yield | Self::BufferTerminator | Self::Return)
    }

    /// Terminator required at the end of this op's region blocks, if it has regions.
    pub const fn region_terminator(self) -> Option<OpKey> {
        match self {
            Self::Parallel | Self::If => Some(Self::Yield),
            Self::Reduce => Some(Self::ReduceReturn),
            Self::BufferReduce | Self::BufferReduceWindow => Some(Self::BufferTerminator),
            _ => None,
        }
    }

    /// Number of regions an op of this kind carries.
    pub const fn num_regions(self) -> usize {
        match self {
            Self::Parallel | Self::Reduce | Self::BufferReduce | Self::BufferReduceWindow => 1,
            Self::If => 2,
            _ => 0,
        }
    }
}

impl std::fmt::Display for OpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
