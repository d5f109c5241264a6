//! `buffer.reduce_window` lowering.
//!
//! The outer loop walks the output, the inner loop walks the window and carries
//! the accumulator. Per axis the operand index is
//! `out_iv * stride + (window_iv - pad_low)`; elements that fall into the padding
//! contribute the init value instead of a load:
//!
//! ```text
//! %init = memory.load(%init_buf)
//! loop.parallel(%o0, %o1) = (0, 0) to (out0, out1) {
//!   %acc = loop.parallel(%w0, %w1) = (0, 0) to (win0, win1) init(%init) {
//!     %i0 = %o0 * stride0 + (%w0 - pad_low0)      // same for %i1
//!     %ok = true && %i0 <u dim0 && %i1 <u dim1
//!     %elem = loop.if(%ok) { yield load(%in, %i0, %i1) } else { yield %init }
//!     loop.reduce(%elem) { <transplanted body> }
//!   }
//!   memory.store(%acc, %out, %o0, %o1)
//! }
//! ```
//!
//! Dilations are not applied.

use kiln_ir::prelude::*;
use kiln_ir::{Result, Shape};
use smallvec::SmallVec;
use tracing::debug;

use super::bounds::{in_bounds, index_extent, resolve_extent};
use super::operands::{BufferOperands, check_operands};
use super::transplant::{MemoryBackedScalars, ScalarConvention, transplant_body};
use crate::config::LoweringConfig;

/// Lowers `buffer.reduce_window` ops.
#[derive(Debug, Clone, Default)]
pub struct ReduceWindowToParallelLoops<C = MemoryBackedScalars> {
    config: LoweringConfig,
    convention: C,
}

impl ReduceWindowToParallelLoops {
    pub fn new(config: LoweringConfig) -> Self {
        Self { config, convention: MemoryBackedScalars }
    }
}

impl<C: ScalarConvention> ReduceWindowToParallelLoops<C> {
    pub fn with_convention(config: LoweringConfig, convention: C) -> Self {
        Self { config, convention }
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }
}

struct Matched {
    operand: ValueId,
    operand_shape: Shape,
    init: ValueId,
    out: ValueId,
    out_shape: Shape,
    window: SmallVec<[i64; 4]>,
    strides: SmallVec<[i64; 4]>,
    pad_low: SmallVec<[i64; 4]>,
    body: BlockId,
}

impl<C: ScalarConvention> ReduceWindowToParallelLoops<C> {
    fn match_op(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> Option<Matched> {
        let func = rewriter.func();
        let operation = func.op(op)?;
        let Op::BufferReduceWindow(attrs) = &operation.op else { return None };
        let attrs = attrs.clone();
        let has_dilations = attrs.has_dilations();
        let [operand, init, out] = operation.operands[..] else { return None };
        let body = func.region_block(op, 0).ok()?;
        let body_arity = func.block(body).args.len();

        let BufferOperands { operand_shape, out_shape } = check_operands(rewriter, op, operand, init, out)?;
        let rank = operand_shape.len();
        if attrs.window_dimensions.len() != rank || out_shape.len() != rank {
            rewriter.emit_error(
                op,
                format!(
                    "window rank {}, operand rank {rank} and output rank {} differ",
                    attrs.window_dimensions.len(),
                    out_shape.len()
                ),
            );
            return None;
        }
        if body_arity != 3 {
            rewriter.emit_error(op, format!("reduction body takes {body_arity} argument(s), expected 3"));
            return None;
        }

        let strides = match attrs.window_strides {
            Some(strides) => Some(strides),
            None if self.config.lenient_window_attrs => {
                rewriter.emit_warning(op, "no window strides specified, assuming unit strides");
                Some(SmallVec::from_elem(1, rank))
            }
            None => {
                rewriter.emit_error(op, "no window strides specified");
                None
            }
        };
        let padding = match attrs.padding {
            Some(padding) => Some(padding),
            None if self.config.lenient_window_attrs => {
                rewriter.emit_warning(op, "no padding specified, assuming zero padding");
                Some(SmallVec::from_elem((0, 0), rank))
            }
            None => {
                rewriter.emit_error(op, "no padding specified");
                None
            }
        };
        let (strides, padding) = (strides?, padding?);
        if strides.len() != rank || padding.len() != rank {
            rewriter.emit_error(
                op,
                format!("expected {rank} strides and padding pairs, got {} and {}", strides.len(), padding.len()),
            );
            return None;
        }
        if strides.contains(&0) {
            rewriter.emit_error(op, "window strides must be positive");
            return None;
        }
        let to_index =
            |values: &[usize]| values.iter().map(|v| index_extent(*v)).collect::<Option<SmallVec<[i64; 4]>>>();
        let window = to_index(attrs.window_dimensions.as_slice());
        let (Some(window), Some(strides)) = (window, to_index(strides.as_slice())) else {
            rewriter.emit_error(op, "window dimensions and strides must fit the index type");
            return None;
        };

        if has_dilations {
            rewriter.emit_remark(
                op,
                "lowering to parallel loops does not support `base_dilations` or `window_dilations`; \
                 the attributes will be ignored",
            );
        }

        Some(Matched {
            operand,
            operand_shape,
            init,
            out,
            out_shape,
            window,
            strides,
            pad_low: padding.iter().map(|(low, _)| *low).collect(),
            body,
        })
    }

    fn rewrite(&self, op: OpId, m: Matched, rewriter: &mut Rewriter<'_>) -> Result<()> {
        let rank = m.operand_shape.len();
        let init = rewriter.load(m.init, &[]);
        let zero = rewriter.const_index(0);
        let one = rewriter.const_index(1);
        let lower: SmallVec<[ValueId; 4]> = SmallVec::from_elem(zero, rank);
        let step: SmallVec<[ValueId; 4]> = SmallVec::from_elem(one, rank);

        let out_upper: SmallVec<[ValueId; 4]> =
            m.out_shape.iter().enumerate().map(|(axis, extent)| resolve_extent(rewriter, m.out, axis, *extent)).collect();
        let output_loop = rewriter.parallel(&lower, &out_upper, &step, &[]);

        rewriter.set_insertion_point_to_start(output_loop.body);
        let window_upper: SmallVec<[ValueId; 4]> = m.window.iter().map(|w| rewriter.const_index(*w)).collect();
        let window_loop = rewriter.parallel(&lower, &window_upper, &step, &[init]);
        rewriter.store(window_loop.results[0], m.out, &output_loop.ivs);

        rewriter.set_insertion_point_to_start(window_loop.body);
        let mut all_in_bounds = rewriter.const_bool(true);
        let mut indices: SmallVec<[ValueId; 4]> = SmallVec::with_capacity(rank);
        for axis in 0..rank {
            let stride = rewriter.const_index(m.strides[axis]);
            let pad_low = rewriter.const_index(m.pad_low[axis]);
            let center = rewriter.mul(output_loop.ivs[axis], stride);
            let offset = rewriter.sub(window_loop.ivs[axis], pad_low);
            let index = rewriter.add(center, offset);
            indices.push(index);

            let extent = resolve_extent(rewriter, m.operand, axis, m.operand_shape[axis]);
            let axis_in_bounds = in_bounds(rewriter, self.config.bounds_check, index, extent);
            all_in_bounds = rewriter.and(all_in_bounds, axis_in_bounds);
        }

        let elem_type = Type::Scalar(rewriter.value_type(init).element());
        let choice = rewriter.if_(&[elem_type], all_in_bounds);
        rewriter.set_insertion_point_to_end(choice.then_block);
        let loaded = rewriter.load(m.operand, &indices);
        rewriter.yield_(&[loaded]);
        rewriter.set_insertion_point_to_end(choice.else_block);
        rewriter.yield_(&[init]);

        rewriter.set_insertion_point_after(choice.op)?;
        let reduce = rewriter.reduce(choice.results[0]);
        transplant_body(rewriter, &reduce, m.body, &self.convention)?;

        rewriter.erase_op(op)?;
        debug!(op = %op, rank, bounds_check = %self.config.bounds_check, "lowered buffer.reduce_window");
        Ok(())
    }
}

impl<C: ScalarConvention + 'static> ConversionPattern for ReduceWindowToParallelLoops<C> {
    fn name(&self) -> &'static str {
        "reduce-window-to-parallel-loops"
    }

    fn root(&self) -> OpKey {
        OpKey::BufferReduceWindow
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
