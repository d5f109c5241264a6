use kiln_dtype::DType;

use crate::builder::Builder;
use crate::function::{Function, ValueDef};
use crate::mapping::IrMapping;
use crate::op::{Op, OpKey};
use crate::shape::Type;
use crate::test::fixtures::{memref, reduce_function, static_dims};
use crate::types::{BinaryOp, ConstValue};
use crate::verify::verify;

#[test]
fn test_constant_is_normalized_to_dtype() {
    let mut func = Function::new("f", []);
    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    let c = b.constant(300i64, DType::UInt8);
    let ValueDef::OpResult { op, .. } = b.func().value(c).def else { panic!("constant is an op result") };
    assert_eq!(b.func().op(op).unwrap().op, Op::Const(ConstValue::UInt(44)));
    assert_eq!(b.value_type(c), &Type::Scalar(DType::UInt8));
}

#[test]
fn test_insertion_point_before_op() {
    let mut func = Function::new("f", []);
    let entry = func.entry_block();
    let ret = Builder::at_end(&mut func, entry).return_();

    let mut b = Builder::before(&mut func, ret).unwrap();
    b.const_index(0);
    b.const_index(1);
    let keys: Vec<OpKey> = func.block(entry).ops.iter().map(|o| func.op(*o).unwrap().op.key()).collect();
    assert_eq!(keys, [OpKey::Const, OpKey::Const, OpKey::Return]);
}

#[test]
fn test_parallel_body_shape() {
    let mut func = Function::new("f", []);
    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    let (c0, c1, c4) = (b.const_index(0), b.const_index(1), b.const_index(4));
    let init = b.constant(0.0, DType::Float32);
    let lp = b.parallel(&[c0, c0], &[c4, c4], &[c1, c1], &[init]);
    b.return_();

    assert_eq!(lp.ivs.len(), 2);
    assert_eq!(lp.results.len(), 1);
    assert_eq!(func.value_type(lp.results[0]), &Type::Scalar(DType::Float32));
    let body_ops = &func.block(lp.body).ops;
    assert_eq!(body_ops.len(), 1);
    assert_eq!(func.op(body_ops[0]).unwrap().op, Op::Yield);
}

#[test]
fn test_reduce_construct_arguments() {
    let mut func = Function::new("f", []);
    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    let (c0, c1, c4) = (b.const_index(0), b.const_index(1), b.const_index(4));
    let init = b.constant(0.0, DType::Float64);
    let lp = b.parallel(&[c0], &[c4], &[c1], &[init]);
    b.set_insertion_point_to_start(lp.body);
    let elem = b.constant(1.0, DType::Float64);
    let reduce = b.reduce(elem);
    b.set_insertion_point_to_end(reduce.body);
    let sum = b.add(reduce.element_arg, reduce.acc_arg);
    b.reduce_return(sum);
    b.set_insertion_point_to_end(entry);
    b.return_();

    assert_eq!(func.value_type(reduce.element_arg), &Type::Scalar(DType::Float64));
    assert_eq!(func.value_type(reduce.acc_arg), &Type::Scalar(DType::Float64));
    assert_eq!(func.parent_op(reduce.op), Some(lp.op));
    verify(&func).unwrap();
}

#[test]
fn test_clone_op_remaps_operands_and_regions() {
    let (mut func, reduce) = reduce_function(&static_dims(&[4]), &[], DType::Float32, &[0], BinaryOp::Add);
    let args = func.arguments().to_vec();

    let mut mapping = IrMapping::new();
    mapping.map(args[0], args[0]);
    mapping.map(args[2], args[1]);
    let clone = Builder::before(&mut func, reduce).and_then(|mut b| b.clone_op(reduce, &mut mapping)).unwrap();

    let cloned = func.op(clone).unwrap();
    assert_eq!(cloned.op, func.op(reduce).unwrap().op);
    assert_eq!(cloned.operands.as_slice(), &[args[0], args[1], args[1]]);

    let nested = func.walk_nested(clone);
    assert_eq!(nested.len(), 2);
    let original_body = func.region_block(reduce, 0).unwrap();
    let cloned_body = func.region_block(clone, 0).unwrap();
    assert_eq!(mapping.lookup_block(original_body), Some(cloned_body));

    // The cloned combinator reads the cloned block arguments, not the originals.
    let cloned_args = &func.block(cloned_body).args;
    assert_eq!(func.op(nested[0]).unwrap().operands.as_slice(), cloned_args.as_slice());
    verify(&func).unwrap();
}

#[test]
fn test_load_store_types() {
    let mut func = Function::new("f", [memref(&static_dims(&[2, 3]), DType::Int32)]);
    let buf = func.arguments()[0];
    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    let (i, j) = (b.const_index(1), b.const_index(2));
    let v = b.load(buf, &[i, j]);
    b.store(v, buf, &[j, i]);
    assert_eq!(b.value_type(v), &Type::Scalar(DType::Int32));
}
