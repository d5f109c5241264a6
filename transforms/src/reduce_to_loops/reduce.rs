//! `buffer.reduce` lowering.
//!
//! ```text
//! buffer.reduce(%in, %init_buf, %out) {dimensions = [1]}   // %in: memref<100x10x5xf32>
//! ```
//!
//! becomes
//!
//! ```text
//! %init = memory.load(%init_buf)
//! loop.parallel(%i, %k) = (0, 0) to (100, 5) {
//!   %acc = loop.parallel(%j) = (0) to (10) init(%init) {
//!     %elem = memory.load(%in, %i, %j, %k)
//!     loop.reduce(%elem) { <transplanted body> }
//!   }
//!   memory.store(%acc, %out, %i, %k)
//! }
//! ```
//!
//! Reducing every axis drops the outer loop and stores through zero indices.

use kiln_ir::prelude::*;
use kiln_ir::{Result, Shape};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::operands::{BufferOperands, check_operands};
use super::partition::{AxisMask, axis_mask, partition_dims};
use super::transplant::{MemoryBackedScalars, ScalarConvention, transplant_body};

/// Lowers single-output `buffer.reduce` ops.
#[derive(Debug, Clone, Default)]
pub struct ReduceToParallelLoops<C = MemoryBackedScalars> {
    convention: C,
}

impl ReduceToParallelLoops {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: ScalarConvention> ReduceToParallelLoops<C> {
    pub fn with_convention(convention: C) -> Self {
        Self { convention }
    }
}

/// Everything the rewrite needs, gathered before any IR is touched.
struct Matched {
    operand: ValueId,
    operand_shape: Shape,
    init: ValueId,
    out: ValueId,
    out_rank: usize,
    mask: AxisMask,
    body: BlockId,
}

impl<C: ScalarConvention> ReduceToParallelLoops<C> {
    fn match_op(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> Option<Matched> {
        let func = rewriter.func();
        let operation = func.op(op)?;
        let Op::BufferReduce(attrs) = &operation.op else { return None };
        if attrs.num_inputs != 1 {
            trace!(op = %op, num_inputs = attrs.num_inputs, "variadic reduce is not supported");
            return None;
        }
        let dimensions = attrs.dimensions.clone();
        let [operand, init, out] = operation.operands[..] else { return None };
        let body = func.region_block(op, 0).ok()?;
        let body_arity = func.block(body).args.len();

        let BufferOperands { operand_shape, out_shape } = check_operands(rewriter, op, operand, init, out)?;
        let out_rank = out_shape.len();

        let rank = operand_shape.len();
        let Some(mask) = axis_mask(rank, &dimensions) else {
            rewriter.emit_error(op, format!("reduced dimensions {:?} out of range for rank {rank}", dimensions.as_slice()));
            return None;
        };
        let kept = mask.iter().filter(|reduced| !**reduced).count();
        if out_rank != kept && !(kept == 0 && out_rank == 1) {
            rewriter.emit_error(op, format!("output rank {out_rank} does not match the {kept} kept dimension(s)"));
            return None;
        }
        if body_arity != 3 {
            rewriter.emit_error(op, format!("reduction body takes {body_arity} argument(s), expected 3"));
            return None;
        }

        Some(Matched { operand, operand_shape, init, out, out_rank, mask, body })
    }

    fn rewrite(&self, op: OpId, m: Matched, rewriter: &mut Rewriter<'_>) -> Result<()> {
        let init = rewriter.load(m.init, &[]);
        let partition = partition_dims(rewriter, m.operand, &m.operand_shape, m.mask);

        let outer = if partition.kept.is_empty() {
            None
        } else {
            let outer = partition.kept.parallel(rewriter, &[]);
            rewriter.set_insertion_point_to_start(outer.body);
            Some(outer)
        };
        let inner = partition.reduced.parallel(rewriter, &[init]);

        let out_indices: SmallVec<[ValueId; 4]> = match &outer {
            Some(outer) => outer.ivs.clone(),
            None => SmallVec::from_elem(partition.zero, m.out_rank),
        };
        rewriter.store(inner.results[0], m.out, &out_indices);

        rewriter.set_insertion_point_to_start(inner.body);
        let kept_ivs = outer.as_ref().map_or(&[][..], |outer| outer.ivs.as_slice());
        let indices = partition.interleave(kept_ivs, &inner.ivs);
        let element = rewriter.load(m.operand, &indices);
        let reduce = rewriter.reduce(element);
        transplant_body(rewriter, &reduce, m.body, &self.convention)?;

        rewriter.erase_op(op)?;
        debug!(op = %op, kept = partition.kept.len(), reduced = partition.reduced.len(), "lowered buffer.reduce");
        Ok(())
    }
}

impl<C: ScalarConvention + 'static> ConversionPattern for ReduceToParallelLoops<C> {
    fn name(&self) -> &'static str {
        "reduce-to-parallel-loops"
    }

    fn root(&self) -> OpKey {
        OpKey::BufferReduce
    }

    fn match_and_rewrite(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> RewriteResult {
        let Some(matched) = self.match_op(op, rewriter) else { return RewriteResult::NoMatch };
        // A failed rewrite leaves the root in place; the driver rejects that and rolls back.
        if let Err(err) = self.rewrite(op, matched, rewriter) {
            rewriter.emit_error(op, err.to_string());
        }
        RewriteResult::Rewritten
    }
}
