//! Operand checks shared by both reduction patterns.

use kiln_ir::Shape;
use kiln_ir::prelude::*;

use super::bounds::oversized_extent;

/// Shapes of a well-typed `(operand, init, out)` triple.
pub struct BufferOperands {
    pub operand_shape: Shape,
    pub out_shape: Shape,
}

/// Check that `operand` and `out` are buffers holding the element type of the
/// rank-0 `init` buffer, with static extents the index type can hold.
///
/// Emits an error on `op` and returns `None` otherwise.
pub fn check_operands(
    rewriter: &mut Rewriter<'_>,
    op: OpId,
    operand: ValueId,
    init: ValueId,
    out: ValueId,
) -> Option<BufferOperands> {
    let func = rewriter.func();
    let [operand_type, init_type, out_type] = [operand, init, out].map(|v| func.value_type(v).clone());
    let (Some(operand_memref), Some(init_memref), Some(out_memref)) =
        (operand_type.as_memref(), init_type.as_memref(), out_type.as_memref())
    else {
        rewriter.emit_error(op, format!("expected buffer operands, got {operand_type}, {init_type} and {out_type}"));
        return None;
    };

    if init_memref.rank() != 0 {
        rewriter.emit_error(op, format!("init must be a rank-0 buffer, got {init_type}"));
        return None;
    }
    if operand_memref.elem != init_memref.elem || out_memref.elem != init_memref.elem {
        rewriter.emit_error(
            op,
            format!(
                "element types differ: operand {}, init {}, output {}",
                operand_memref.elem, init_memref.elem, out_memref.elem
            ),
        );
        return None;
    }
    if let Some(extent) = oversized_extent(&operand_memref.shape).or_else(|| oversized_extent(&out_memref.shape)) {
        rewriter.emit_error(op, format!("extent {extent} does not fit the index type"));
        return None;
    }

    Some(BufferOperands { operand_shape: operand_memref.shape.clone(), out_shape: out_memref.shape.clone() })
}
