//! Structured control flow: parallel loops, reductions and conditionals.

use smallvec::SmallVec;

use super::Builder;
use crate::function::{BlockId, OpId, ValueId};
use crate::op::Op;
use crate::shape::Type;

/// Handles of a freshly built `Parallel` op.
#[derive(Debug, Clone)]
pub struct ParallelLoop {
    pub op: OpId,
    /// Body block, already terminated by an empty `Yield`.
    pub body: BlockId,
    /// Induction variables, one per loop.
    pub ivs: SmallVec<[ValueId; 4]>,
    /// Final accumulators, one per init value.
    pub results: SmallVec<[ValueId; 2]>,
}

/// Handles of a freshly built `Reduce` op. The body is left unterminated.
#[derive(Debug, Clone, Copy)]
pub struct ReduceConstruct {
    pub op: OpId,
    pub body: BlockId,
    pub element_arg: ValueId,
    pub acc_arg: ValueId,
}

/// Handles of a freshly built `If` op. Both blocks are left unterminated.
#[derive(Debug, Clone)]
pub struct IfConstruct {
    pub op: OpId,
    pub then_block: BlockId,
    pub else_block: BlockId,
    pub results: SmallVec<[ValueId; 2]>,
}

impl Builder<'_> {
    /// Multi-dimensional parallel loop over `[lbs, ubs)` with `steps`.
    ///
    /// Each init value gets one result; a `Reduce` in the body combines into it.
    pub fn parallel(&mut self, lbs: &[ValueId], ubs: &[ValueId], steps: &[ValueId], inits: &[ValueId]) -> ParallelLoop {
        debug_assert!(lbs.len() == ubs.len() && ubs.len() == steps.len(), "loop bound segments differ in length");
        let num_loops = lbs.len();
        let operands: Vec<ValueId> = [lbs, ubs, steps, inits].concat();
        let result_types: Vec<Type> = inits.iter().map(|v| self.value_type(*v).clone()).collect();

        let op = self.create(Op::Parallel { num_loops }, &operands, &result_types);
        let body = self.add_block(op, 0, std::iter::repeat_n(Type::index(), num_loops));
        self.func_mut().insert_op(body, 0, Op::Yield, &[], &[], 0);

        let ivs = self.func().block(body).args.clone();
        let results = self.func().results_of(op).iter().copied().collect();
        ParallelLoop { op, body, ivs, results }
    }

    /// Reduction of `element` into the enclosing parallel loop's accumulator.
    ///
    /// The body block takes `(element, accumulator)` of the element type and must be
    /// terminated with [`reduce_return`](Self::reduce_return).
    pub fn reduce(&mut self, element: ValueId) -> ReduceConstruct {
        let ty = self.value_type(element).clone();
        let op = self.create(Op::Reduce, &[element], &[]);
        let body = self.add_block(op, 0, [ty.clone(), ty]);
        let args = &self.func().block(body).args;
        ReduceConstruct { op, body, element_arg: args[0], acc_arg: args[1] }
    }

    pub fn reduce_return(&mut self, value: ValueId) -> OpId {
        self.create(Op::ReduceReturn, &[value], &[])
    }

    pub fn yield_(&mut self, values: &[ValueId]) -> OpId {
        self.create(Op::Yield, values, &[])
    }

    /// Two-way conditional producing `result_types`.
    pub fn if_(&mut self, result_types: &[Type], cond: ValueId) -> IfConstruct {
        let op = self.create(Op::If, &[cond], result_types);
        let then_block = self.add_block(op, 0, []);
        let else_block = self.add_block(op, 1, []);
        let results = self.func().results_of(op).iter().copied().collect();
        IfConstruct { op, then_block, else_block, results }
    }
}
