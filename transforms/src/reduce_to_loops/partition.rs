//! Kept/reduced axis partitioning.

use kiln_ir::prelude::*;
use smallvec::SmallVec;

use super::bounds::resolve_extent;

/// Per-axis membership: `true` for reduced axes.
pub type AxisMask = SmallVec<[bool; 4]>;

/// Membership mask of `axes` over `rank` axes, `None` if an axis is out of range.
pub fn axis_mask(rank: usize, axes: &[usize]) -> Option<AxisMask> {
    let mut mask: AxisMask = SmallVec::from_elem(false, rank);
    for axis in axes {
        *mask.get_mut(*axis)? = true;
    }
    Some(mask)
}

/// Operand segments of one `loop.parallel`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopBounds {
    pub lower: SmallVec<[ValueId; 4]>,
    pub upper: SmallVec<[ValueId; 4]>,
    pub step: SmallVec<[ValueId; 4]>,
}

impl LoopBounds {
    pub fn push(&mut self, lower: ValueId, upper: ValueId, step: ValueId) {
        self.lower.push(lower);
        self.upper.push(upper);
        self.step.push(step);
    }

    pub fn len(&self) -> usize {
        self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty()
    }

    /// Build a `loop.parallel` over these bounds.
    pub fn parallel(&self, b: &mut Builder<'_>, inits: &[ValueId]) -> ParallelLoop {
        b.parallel(&self.lower, &self.upper, &self.step, inits)
    }
}

/// Loop bounds of an operand split into kept and reduced axes, both in axis order.
#[derive(Debug, Clone)]
pub struct DimensionPartition {
    pub kept: LoopBounds,
    pub reduced: LoopBounds,
    pub mask: AxisMask,
    /// Index constant `0`, shared by every lower bound.
    pub zero: ValueId,
}

impl DimensionPartition {
    /// Full operand coordinates from the kept and reduced induction variables.
    pub fn interleave(&self, kept_ivs: &[ValueId], reduced_ivs: &[ValueId]) -> SmallVec<[ValueId; 4]> {
        interleave(&self.mask, kept_ivs, reduced_ivs)
    }
}

/// Emit loop bounds for every axis of `operand` (lower `0`, step `1`) and split them
/// by `mask`.
pub fn partition_dims(b: &mut Builder<'_>, operand: ValueId, shape: &[Dim], mask: AxisMask) -> DimensionPartition {
    debug_assert_eq!(shape.len(), mask.len(), "mask does not cover the operand");
    let zero = b.const_index(0);
    let one = b.const_index(1);

    let (mut kept, mut reduced) = (LoopBounds::default(), LoopBounds::default());
    for (axis, (extent, is_reduced)) in shape.iter().zip(&mask).enumerate() {
        let upper = resolve_extent(b, operand, axis, *extent);
        let bounds = if *is_reduced { &mut reduced } else { &mut kept };
        bounds.push(zero, upper, one);
    }
    DimensionPartition { kept, reduced, mask, zero }
}

/// Merge two sequences back into axis order: reduced axes draw from `reduced`,
/// kept axes from `kept`, each through its own cursor.
pub fn interleave<T: Copy>(mask: &[bool], kept: &[T], reduced: &[T]) -> SmallVec<[T; 4]> {
    debug_assert_eq!(mask.iter().filter(|r| **r).count(), reduced.len(), "reduced sequence length");
    debug_assert_eq!(mask.iter().filter(|r| !**r).count(), kept.len(), "kept sequence length");
    let mut kept_cursor = kept.iter();
    let mut reduced_cursor = reduced.iter();
    mask.iter()
        .filter_map(|is_reduced| if *is_reduced { reduced_cursor.next() } else { kept_cursor.next() })
        .copied()
        .collect()
}
