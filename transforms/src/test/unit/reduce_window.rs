use kiln_ir::prelude::*;
use kiln_ir::test::fixtures::{binary_body, memref, reduce_window_function, static_dims};
use kiln_ir::{Diagnostics, Error, HostBuffer, Interpreter, Severity};
use test_case::test_case;

use crate::config::{BoundsCheck, LoweringConfig};
use crate::test::helpers::{assert_lowering_preserves, lower_with, lowered_with, scalar_buffer};

fn iota(shape: &[usize]) -> HostBuffer {
    let len: usize = shape.iter().product();
    let values: Vec<f32> = (0..len).map(|i| i as f32).collect();
    HostBuffer::from_values(shape, &values).unwrap()
}

fn predicates(func: &Function) -> Vec<CmpPredicate> {
    func.find_ops(OpKey::Cmp)
        .into_iter()
        .filter_map(|op| match func.get(op).ok()?.op {
            Op::Cmp(predicate) => Some(predicate),
            _ => None,
        })
        .collect()
}

fn messages(diagnostics: &Diagnostics, severity: Severity) -> Vec<String> {
    diagnostics.with_severity(severity).map(|d| d.message.clone()).collect()
}

#[test]
fn test_strided_window_max() {
    let attrs = ReduceWindowAttrs::new([3, 3]).with_strides([2, 2]).with_padding([(0, 0), (0, 0)]);
    let (func, _) =
        reduce_window_function(&static_dims(&[4, 4]), &static_dims(&[1, 1]), DType::Float32, attrs, BinaryOp::Max);
    let args = vec![iota(&[4, 4]), scalar_buffer(DType::Float32, f64::NEG_INFINITY), HostBuffer::zeros(&[1, 1], DType::Float32)];

    let lowered = assert_lowering_preserves(&func, args.clone(), LoweringConfig::default());
    assert_eq!(Interpreter::run(&lowered, args).unwrap()[2].to_f64(), [10.0]);

    let loops = lowered.find_ops(OpKey::Parallel);
    assert_eq!(loops.len(), 2);
    assert_eq!(lowered.get(loops[0]).unwrap().op, Op::Parallel { num_loops: 2 });
    assert_eq!(lowered.get(loops[1]).unwrap().op, Op::Parallel { num_loops: 2 });
    assert_eq!(lowered.parent_op(loops[1]), Some(loops[0]));
    assert_eq!(lowered.results_of(loops[1]).len(), 1);

    let choice = lowered.find_ops(OpKey::If);
    assert_eq!(choice.len(), 1);
    assert_eq!(lowered.parent_op(choice[0]), Some(loops[1]));
    let reduce = lowered.find_ops(OpKey::Reduce);
    assert_eq!(lowered.operands_of(reduce[0]), lowered.results_of(choice[0]));

    assert_eq!(predicates(&lowered), [CmpPredicate::Ult, CmpPredicate::Ult]);
    assert_eq!(lowered.count_ops(OpKey::Dim), 0);
}

#[test_case(BoundsCheck::UnsignedWrap; "unsigned")]
#[test_case(BoundsCheck::SignedRange; "signed")]
fn test_padding_feeds_init(bounds_check: BoundsCheck) {
    let attrs = ReduceWindowAttrs::new([2]).with_strides([1]).with_padding([(1, 0)]);
    let (func, _) = reduce_window_function(&static_dims(&[3]), &static_dims(&[3]), DType::Float32, attrs, BinaryOp::Max);
    let args = vec![
        HostBuffer::from_values(&[3], &[5.0f32, 1.0, 7.0]).unwrap(),
        scalar_buffer(DType::Float32, f64::NEG_INFINITY),
        HostBuffer::zeros(&[3], DType::Float32),
    ];
    let config = LoweringConfig::builder().bounds_check(bounds_check).build();
    let lowered = assert_lowering_preserves(&func, args.clone(), config);
    assert_eq!(Interpreter::run(&lowered, args).unwrap()[2].to_f64(), [5.0, 5.0, 7.0]);

    let expected = match bounds_check {
        BoundsCheck::UnsignedWrap => vec![CmpPredicate::Ult],
        BoundsCheck::SignedRange => vec![CmpPredicate::Sge, CmpPredicate::Slt],
    };
    assert_eq!(predicates(&lowered), expected);
}

#[test]
fn test_padded_sum_on_both_sides() {
    let attrs = ReduceWindowAttrs::new([3, 2]).with_strides([2, 1]).with_padding([(1, 1), (0, 1)]);
    let (func, _) =
        reduce_window_function(&static_dims(&[4, 3]), &static_dims(&[2, 3]), DType::Int32, attrs, BinaryOp::Add);
    let input = HostBuffer::new(&[4, 3], DType::Int32, (0..12).map(|v| ConstValue::Int(v - 6)).collect()).unwrap();
    let args = vec![input, scalar_buffer(DType::Int32, 0.0), HostBuffer::zeros(&[2, 3], DType::Int32)];
    assert_lowering_preserves(&func, args, LoweringConfig::default());
}

#[test]
fn test_dynamic_operand_extent_is_queried() {
    let attrs = ReduceWindowAttrs::new([2, 2]).with_strides([1, 1]).with_padding([(0, 0), (0, 0)]);
    let (func, _) = reduce_window_function(
        &[Dim::Dynamic, Dim::Static(3)],
        &[Dim::Dynamic, Dim::Static(2)],
        DType::Float32,
        attrs,
        BinaryOp::Add,
    );
    let args = vec![iota(&[3, 3]), scalar_buffer(DType::Float32, 0.0), HostBuffer::zeros(&[2, 2], DType::Float32)];
    let lowered = assert_lowering_preserves(&func, args, LoweringConfig::default());

    // One query for the output loop bound and one for the operand range check.
    let dims = lowered.find_ops(OpKey::Dim);
    assert_eq!(dims.len(), 2);
    let queried: Vec<_> = dims.iter().map(|op| lowered.operands_of(*op)[0]).collect();
    assert_eq!(queried, [lowered.arguments()[2], lowered.arguments()[0]]);
}

#[test_case(ReduceWindowAttrs::new([2]).with_padding([(0, 0)]), &["no window strides specified"]; "strides")]
#[test_case(ReduceWindowAttrs::new([2]).with_strides([1]), &["no padding specified"]; "padding")]
#[test_case(ReduceWindowAttrs::new([2]), &["no window strides specified", "no padding specified"]; "both")]
fn test_missing_attrs_are_rejected(attrs: ReduceWindowAttrs, expected: &[&str]) {
    let (mut func, root) =
        reduce_window_function(&static_dims(&[4]), &static_dims(&[3]), DType::Float32, attrs, BinaryOp::Add);
    let before = func.tree();
    let (result, diagnostics) = lower_with(&mut func, LoweringConfig::default());

    assert!(matches!(result, Err(Error::LegalizationFailed { op_name: "buffer.reduce_window", unconverted: 1 })));
    assert_eq!(func.tree(), before);
    assert!(func.is_live(root));
    let errors = messages(&diagnostics, Severity::Error);
    for message in expected {
        assert!(errors.iter().any(|e| e == message), "{errors:?}");
    }
}

#[test]
fn test_lenient_mode_assumes_defaults() {
    let (func, _) = reduce_window_function(
        &static_dims(&[5]),
        &static_dims(&[4]),
        DType::Float32,
        ReduceWindowAttrs::new([2]),
        BinaryOp::Add,
    );
    let config = LoweringConfig::builder().lenient_window_attrs(true).build();

    let mut lowered = func.clone();
    let (result, diagnostics) = lower_with(&mut lowered, config.clone());
    result.unwrap();
    assert_eq!(messages(&diagnostics, Severity::Warning).len(), 2);
    assert!(!diagnostics.has_errors());

    let args = vec![iota(&[5]), scalar_buffer(DType::Float32, 0.0), HostBuffer::zeros(&[4], DType::Float32)];
    let lowered = assert_lowering_preserves(&func, args.clone(), config);
    assert_eq!(Interpreter::run(&lowered, args).unwrap()[2].to_f64(), [1.0, 3.0, 5.0, 7.0]);
}

#[test]
fn test_dilations_are_ignored_with_remark() {
    let attrs = ReduceWindowAttrs::new([2])
        .with_strides([1])
        .with_padding([(0, 0)])
        .with_base_dilations([2])
        .with_window_dilations([1]);
    let (func, root) =
        reduce_window_function(&static_dims(&[4]), &static_dims(&[3]), DType::Int64, attrs, BinaryOp::Max);

    let mut lowered = func.clone();
    let (result, diagnostics) = lower_with(&mut lowered, LoweringConfig::default());
    result.unwrap();
    assert!(messages(&diagnostics, Severity::Warning).is_empty());
    let remarks: Vec<_> = diagnostics.with_severity(Severity::Remark).collect();
    assert_eq!(remarks.len(), 1);
    assert_eq!(remarks[0].op, root);
    assert!(remarks[0].message.contains("dilations"));

    let input = HostBuffer::from_values(&[4], &[4i64, -1, 9, 2]).unwrap();
    let args = vec![input, scalar_buffer(DType::Int64, -99.0), HostBuffer::zeros(&[3], DType::Int64)];
    let lowered = assert_lowering_preserves(&func, args.clone(), LoweringConfig::default());
    assert_eq!(Interpreter::run(&lowered, args).unwrap()[2].to_f64(), [4.0, 9.0, 9.0]);
}

#[test]
fn test_rank_mismatch_is_reported() {
    let attrs = ReduceWindowAttrs::new([2]).with_strides([1]).with_padding([(0, 0)]);
    let (mut func, root) =
        reduce_window_function(&static_dims(&[4, 4]), &static_dims(&[3, 4]), DType::Float32, attrs, BinaryOp::Add);
    let (result, diagnostics) = lower_with(&mut func, LoweringConfig::default());

    assert!(result.is_err());
    assert!(diagnostics.with_severity(Severity::Error).any(|d| d.op == root && d.message.contains("rank")));
}

#[test_case(&[1], DType::Float32, "init must be a rank-0 buffer"; "init rank")]
#[test_case(&[], DType::Float64, "element types differ"; "element types")]
fn test_mistyped_init_is_reported(init_shape: &[usize], init_dtype: DType, message: &str) {
    let params = [
        memref(&static_dims(&[4]), DType::Float32),
        memref(&static_dims(init_shape), init_dtype),
        memref(&static_dims(&[3]), DType::Float32),
    ];
    let mut func = Function::new("reduce_window", params);
    let args = func.arguments().to_vec();
    let entry = func.entry_block();
    let root = {
        let mut b = Builder::at_end(&mut func, entry);
        let attrs = ReduceWindowAttrs::new([2]).with_strides([1]).with_padding([(0, 0)]);
        let reduce = b.buffer_reduce_window(attrs, args[0], args[1], args[2]);
        binary_body(&mut b, reduce.body, BinaryOp::Add);
        b.return_();
        reduce.op
    };
    let before = func.tree();

    let (result, diagnostics) = lower_with(&mut func, LoweringConfig::default());
    assert!(matches!(result, Err(Error::LegalizationFailed { unconverted: 1, .. })));
    assert_eq!(func.tree(), before);
    assert!(diagnostics.with_severity(Severity::Error).any(|d| d.op == root && d.message.starts_with(message)));
}

#[test]
fn test_oversized_window_is_reported() {
    let attrs = ReduceWindowAttrs::new([usize::MAX]).with_strides([1]).with_padding([(0, 0)]);
    let (mut func, root) =
        reduce_window_function(&static_dims(&[4]), &static_dims(&[1]), DType::Float32, attrs, BinaryOp::Add);
    let (result, diagnostics) = lower_with(&mut func, LoweringConfig::default());

    assert!(result.is_err());
    assert!(func.is_live(root));
    let errors = messages(&diagnostics, Severity::Error);
    assert!(errors.iter().any(|e| e == "window dimensions and strides must fit the index type"), "{errors:?}");
}

#[test]
fn test_signed_range_config_is_used() {
    let attrs = ReduceWindowAttrs::new([2, 2]).with_strides([1, 1]).with_padding([(1, 0), (0, 1)]);
    let (func, _) =
        reduce_window_function(&static_dims(&[2, 2]), &static_dims(&[2, 2]), DType::Float64, attrs, BinaryOp::Min);
    let config = LoweringConfig::builder().bounds_check(BoundsCheck::SignedRange).build();
    let lowered = lowered_with(&func, config);
    assert_eq!(predicates(&lowered).len(), 4);
    assert!(!predicates(&lowered).contains(&CmpPredicate::Ult));
}
