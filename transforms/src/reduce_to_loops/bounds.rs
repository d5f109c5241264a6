//! Loop extents and index range checks.

use kiln_ir::prelude::*;

use crate::config::BoundsCheck;

/// `extent` as an index value, if the index type can hold it.
pub fn index_extent(extent: usize) -> Option<i64> {
    i64::try_from(extent).ok()
}

/// First static extent of `shape` the index type cannot hold.
pub fn oversized_extent(shape: &[Dim]) -> Option<usize> {
    shape.iter().filter_map(Dim::as_static).find(|extent| index_extent(*extent).is_none())
}

/// Upper bound of `axis` of `buffer`: an index constant when the extent is static
/// and representable, a `memory.dim` query otherwise.
///
/// Every call emits a fresh op at the builder's insertion point.
pub fn resolve_extent(b: &mut Builder<'_>, buffer: ValueId, axis: usize, extent: Dim) -> ValueId {
    match extent.as_static().and_then(index_extent) {
        Some(extent) => b.const_index(extent),
        None => b.dim(buffer, axis),
    }
}

/// `i1` that is true iff `0 <= index < extent`.
pub fn in_bounds(b: &mut Builder<'_>, check: BoundsCheck, index: ValueId, extent: ValueId) -> ValueId {
    match check {
        BoundsCheck::UnsignedWrap => b.cmp(CmpPredicate::Ult, index, extent),
        BoundsCheck::SignedRange => {
            let zero = b.const_index(0);
            let above_low = b.cmp(CmpPredicate::Sge, index, zero);
            let below_high = b.cmp(CmpPredicate::Slt, index, extent);
            b.and(above_low, below_high)
        }
    }
}
