//! Buffer-level operations.
//!
//! These are the inputs of the reduce lowering; bodies work on rank-0 memrefs.

use kiln_dtype::DType;

use super::Builder;
use crate::function::{BlockId, OpId, ValueId};
use crate::op::{Op, ReduceAttrs, ReduceWindowAttrs};
use crate::shape::{MemRefType, Type};
use crate::types::BinaryOp;

/// Handles of a freshly built buffer reduction. The body is left unterminated.
#[derive(Debug, Clone, Copy)]
pub struct BufferReduceOp {
    pub op: OpId,
    pub body: BlockId,
}

impl Builder<'_> {
    /// Plain reduction of `inputs` over `attrs.dimensions` into `outs`.
    ///
    /// The body takes `(element, accumulator, result)` rank-0 memrefs, each group
    /// repeated per input.
    pub fn buffer_reduce(
        &mut self,
        attrs: ReduceAttrs,
        inputs: &[ValueId],
        inits: &[ValueId],
        outs: &[ValueId],
    ) -> BufferReduceOp {
        let elem = self.value_type(inputs[0]).element();
        let num_inputs = inputs.len();
        let operands: Vec<ValueId> = [inputs, inits, outs].concat();
        let op = self.create(Op::BufferReduce(ReduceAttrs { num_inputs, ..attrs }), &operands, &[]);
        let body = self.add_block(op, 0, body_signature(elem, num_inputs));
        BufferReduceOp { op, body }
    }

    pub fn buffer_reduce_window(
        &mut self,
        attrs: ReduceWindowAttrs,
        operand: ValueId,
        init: ValueId,
        out: ValueId,
    ) -> BufferReduceOp {
        let elem = self.value_type(operand).element();
        let op = self.create(Op::BufferReduceWindow(attrs), &[operand, init, out], &[]);
        let body = self.add_block(op, 0, body_signature(elem, 1));
        BufferReduceOp { op, body }
    }

    /// `out = lhs op rhs` elementwise.
    pub fn buffer_binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId, out: ValueId) -> OpId {
        self.create(Op::BufferBinary(op), &[lhs, rhs, out], &[])
    }

    pub fn buffer_terminator(&mut self) -> OpId {
        self.create(Op::BufferTerminator, &[], &[])
    }

    pub fn return_(&mut self) -> OpId {
        self.create(Op::Return, &[], &[])
    }
}

fn body_signature(elem: DType, num_inputs: usize) -> impl Iterator<Item = Type> {
    std::iter::repeat_n(Type::MemRef(MemRefType::scalar(elem)), 3 * num_inputs)
}
