//! Moving a buffer reduction body into a `loop.reduce`.
//!
//! Buffer reduction bodies take `(element, accumulator, result)` as rank-0 buffer
//! cells and write the combined value into `result`. A `loop.reduce` body takes
//! `(element, accumulator)` as scalars and returns the combined value. The
//! [`ScalarConvention`] bridges the two; [`transplant_body`] clones the ops.

use kiln_ir::prelude::*;
use kiln_ir::{IrMapping, Result};
use tracing::trace;

/// Translation between by-value scalars and whatever the transplanted ops expect.
pub trait ScalarConvention: Send + Sync {
    /// Make `value` available in place of a body parameter of type `param`.
    fn pass_in(&self, b: &mut Builder<'_>, value: ValueId, param: &Type) -> ValueId;

    /// Read the combined value back out of `slot`, as returned by [`pass_in`](Self::pass_in).
    fn read_out(&self, b: &mut Builder<'_>, slot: ValueId) -> ValueId;
}

/// Scalars live in freshly allocated rank-0 buffer cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackedScalars;

impl ScalarConvention for MemoryBackedScalars {
    fn pass_in(&self, b: &mut Builder<'_>, value: ValueId, param: &Type) -> ValueId {
        let cell_type = match param.as_memref() {
            Some(memref) => memref.clone(),
            None => MemRefType::scalar(b.value_type(value).element()),
        };
        let cell = b.alloc(cell_type);
        b.store(value, cell, &[]);
        cell
    }

    fn read_out(&self, b: &mut Builder<'_>, slot: ValueId) -> ValueId {
        b.load(slot, &[])
    }
}

/// Fill the body of `reduce` with the non-terminator ops of `source`.
///
/// `source` must have the `(element, accumulator, result)` signature. The
/// accumulator slot doubles as the result slot, so the body's write to `result`
/// is what gets returned. The builder's insertion point is restored afterwards.
pub fn transplant_body(
    b: &mut Builder<'_>,
    reduce: &ReduceConstruct,
    source: BlockId,
    convention: &impl ScalarConvention,
) -> Result<()> {
    let params = b.func().block(source).args.clone();
    debug_assert_eq!(params.len(), 3, "reduction body signature");
    let param_types: Vec<Type> = params.iter().map(|p| b.value_type(*p).clone()).collect();
    let body_ops: Vec<OpId> = b
        .func()
        .block(source)
        .ops
        .iter()
        .copied()
        .filter(|op| b.func().op(*op).is_some_and(|o| !o.op.is_terminator()))
        .collect();

    let saved = b.insertion_point();
    b.set_insertion_point_to_start(reduce.body);
    let element_slot = convention.pass_in(b, reduce.element_arg, &param_types[0]);
    let acc_slot = convention.pass_in(b, reduce.acc_arg, &param_types[1]);

    let mut mapping = IrMapping::new();
    mapping.map_values(&params, &[element_slot, acc_slot, acc_slot]);
    for op in body_ops {
        b.clone_op(op, &mut mapping)?;
    }
    trace!(reduce = %reduce.op, source = %source, "reduction body transplanted");

    let combined = convention.read_out(b, acc_slot);
    b.reduce_return(combined);
    b.set_insertion_point(saved);
    Ok(())
}
