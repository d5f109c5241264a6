use kiln_ir::eval::eval_cmp;
use kiln_ir::prelude::*;
use test_case::test_case;

use crate::config::BoundsCheck;
use crate::reduce_to_loops::bounds::{in_bounds, index_extent, oversized_extent, resolve_extent};

fn buffer_function(shape: &[Dim]) -> Function {
    Function::new("extents", [Type::MemRef(MemRefType::new(shape.iter().copied(), DType::Float32))])
}

#[test]
fn test_static_extent_is_constant() {
    let mut func = buffer_function(&[Dim::Static(7)]);
    let buffer = func.arguments()[0];
    let entry = func.entry_block();
    let extent = resolve_extent(&mut Builder::at_end(&mut func, entry), buffer, 0, Dim::Static(7));

    let ops = func.walk();
    assert_eq!(ops.len(), 1);
    let operation = func.get(ops[0]).unwrap();
    assert_eq!(operation.op, Op::Const(ConstValue::Int(7)));
    assert_eq!(operation.results[0], extent);
    assert_eq!(func.value_type(extent), &Type::index());
}

#[test]
fn test_unrepresentable_extent_is_queried() {
    let mut func = buffer_function(&[Dim::Static(usize::MAX)]);
    let buffer = func.arguments()[0];
    let entry = func.entry_block();
    resolve_extent(&mut Builder::at_end(&mut func, entry), buffer, 0, Dim::Static(usize::MAX));

    assert_eq!(func.count_ops(OpKey::Const), 0);
    assert_eq!(func.count_ops(OpKey::Dim), 1);
}

#[test_case(&[Dim::Static(4), Dim::Dynamic], None; "representable")]
#[test_case(&[Dim::Dynamic, Dim::Static(usize::MAX)], Some(usize::MAX); "too large")]
#[test_case(&[Dim::Static(i64::MAX as usize)], None; "largest index")]
fn test_oversized_extent(shape: &[Dim], expected: Option<usize>) {
    assert_eq!(oversized_extent(shape), expected);
}

#[test]
fn test_index_extent_is_checked() {
    assert_eq!(index_extent(12), Some(12));
    assert_eq!(index_extent(i64::MAX as usize + 1), None);
}

#[test]
fn test_dynamic_extent_queries_every_time() {
    let mut func = buffer_function(&[Dim::Static(2), Dim::Dynamic]);
    let buffer = func.arguments()[0];
    let entry = func.entry_block();
    let (first, second) = {
        let mut b = Builder::at_end(&mut func, entry);
        (resolve_extent(&mut b, buffer, 1, Dim::Dynamic), resolve_extent(&mut b, buffer, 1, Dim::Dynamic))
    };

    assert_ne!(first, second);
    let dims = func.find_ops(OpKey::Dim);
    assert_eq!(dims.len(), 2);
    for dim in dims {
        let operation = func.get(dim).unwrap();
        assert_eq!(operation.op, Op::Dim { axis: 1 });
        assert_eq!(operation.operands.as_slice(), [buffer]);
    }
}

#[test_case(BoundsCheck::UnsignedWrap, 1, 0; "unsigned is a single compare")]
#[test_case(BoundsCheck::SignedRange, 2, 1; "signed checks both ends")]
fn test_in_bounds_shape(check: BoundsCheck, compares: usize, ands: usize) {
    let mut func = Function::new("check", []);
    let entry = func.entry_block();
    let predicate = {
        let mut b = Builder::at_end(&mut func, entry);
        let index = b.const_index(3);
        let extent = b.const_index(4);
        in_bounds(&mut b, check, index, extent)
    };

    assert_eq!(func.value_type(predicate), &Type::bool_());
    assert_eq!(func.count_ops(OpKey::Cmp), compares);
    assert_eq!(func.count_ops(OpKey::Binary), ands);
}

/// The single unsigned compare agrees with the two-sided signed range check.
#[test_case(-1, 4; "negative")]
#[test_case(-4096, 4; "far negative")]
#[test_case(0, 4; "first")]
#[test_case(3, 4; "last")]
#[test_case(4, 4; "one past the end")]
#[test_case(0, 0; "empty axis")]
#[test_case(i64::MIN, 4; "minimum")]
fn test_unsigned_compare_matches_range_check(index: i64, extent: i64) {
    let unsigned = eval_cmp(CmpPredicate::Ult, ConstValue::Int(index), ConstValue::Int(extent), DType::Index);
    assert_eq!(unsigned, Some((0..extent).contains(&index)));
}
