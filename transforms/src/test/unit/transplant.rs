use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_ir::HostBuffer;
use kiln_ir::prelude::*;
use kiln_ir::test::fixtures::{reduce_function, static_dims};

use crate::reduce_to_loops::transplant::{MemoryBackedScalars, ScalarConvention, transplant_body};

/// Builds `parallel(0..4) init(%init) { reduce(load %in[i]) {} }` ahead of the
/// `buffer.reduce` of the fixture and returns the pieces.
fn reduce_skeleton(func: &mut Function, source_op: OpId) -> (ReduceConstruct, BlockId) {
    let args = func.arguments().to_vec();
    let source = func.region_block(source_op, 0).unwrap();
    let mut b = Builder::before(func, source_op).unwrap();
    let init = b.load(args[1], &[]);
    let (c0, c1, c4) = (b.const_index(0), b.const_index(1), b.const_index(4));
    let lp = b.parallel(&[c0], &[c4], &[c1], &[init]);
    b.store(lp.results[0], args[2], &[]);
    b.set_insertion_point_to_start(lp.body);
    let element = b.load(args[0], &[lp.ivs[0]]);
    (b.reduce(element), source)
}

#[test]
fn test_memory_backed_body() {
    let (mut func, source_op) = reduce_function(&static_dims(&[4]), &[], DType::Int64, &[0], BinaryOp::Add);
    let (reduce, source) = reduce_skeleton(&mut func, source_op);

    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    let before = b.insertion_point();
    transplant_body(&mut b, &reduce, source, &MemoryBackedScalars).unwrap();
    assert_eq!(b.insertion_point(), before);

    let body_ops = func.block(reduce.body).ops.clone();
    let keys: Vec<OpKey> = body_ops.iter().map(|op| func.get(*op).unwrap().op.key()).collect();
    assert_eq!(
        keys,
        [OpKey::Alloc, OpKey::Store, OpKey::Alloc, OpKey::Store, OpKey::BufferBinary, OpKey::Load, OpKey::ReduceReturn]
    );

    let element_cell = func.results_of(body_ops[0])[0];
    let acc_cell = func.results_of(body_ops[2])[0];
    assert_eq!(func.operands_of(body_ops[1]), [reduce.element_arg, element_cell]);
    assert_eq!(func.operands_of(body_ops[3]), [reduce.acc_arg, acc_cell]);
    assert_eq!(func.operands_of(body_ops[4]), [element_cell, acc_cell, acc_cell]);
    assert_eq!(func.operands_of(body_ops[5]), [acc_cell]);
    assert_eq!(func.value_type(element_cell), &Type::MemRef(MemRefType::scalar(DType::Int64)));
}

#[test]
fn test_transplanted_reduction_runs() {
    let (mut func, source_op) = reduce_function(&static_dims(&[4]), &[], DType::Int64, &[0], BinaryOp::Max);
    let (reduce, source) = reduce_skeleton(&mut func, source_op);
    {
        let entry = func.entry_block();
        let mut b = Builder::at_end(&mut func, entry);
        transplant_body(&mut b, &reduce, source, &MemoryBackedScalars).unwrap();
    }
    func.erase_op(source_op).unwrap();
    kiln_ir::verify(&func).unwrap();

    let args = vec![
        HostBuffer::from_values(&[4], &[3i64, -8, 11, 2]).unwrap(),
        HostBuffer::filled(&[], DType::Int64, -100i64),
        HostBuffer::zeros(&[], DType::Int64),
    ];
    let results = kiln_ir::Interpreter::run(&func, args).unwrap();
    assert_eq!(results[2].to_f64(), [11.0]);
}

/// Memory-backed convention that counts how often it is asked to translate.
#[derive(Default)]
struct CountingScalars {
    passed_in: AtomicUsize,
    read_out: AtomicUsize,
}

impl ScalarConvention for CountingScalars {
    fn pass_in(&self, b: &mut Builder<'_>, value: ValueId, param: &Type) -> ValueId {
        self.passed_in.fetch_add(1, Ordering::Relaxed);
        MemoryBackedScalars.pass_in(b, value, param)
    }

    fn read_out(&self, b: &mut Builder<'_>, slot: ValueId) -> ValueId {
        self.read_out.fetch_add(1, Ordering::Relaxed);
        MemoryBackedScalars.read_out(b, slot)
    }
}

#[test]
fn test_convention_is_pluggable() {
    let (mut func, source_op) = reduce_function(&static_dims(&[4]), &[], DType::Float32, &[0], BinaryOp::Add);
    let (reduce, source) = reduce_skeleton(&mut func, source_op);
    let convention = CountingScalars::default();
    {
        let entry = func.entry_block();
        let mut b = Builder::at_end(&mut func, entry);
        transplant_body(&mut b, &reduce, source, &convention).unwrap();
    }
    assert_eq!(convention.passed_in.load(Ordering::Relaxed), 2);
    assert_eq!(convention.read_out.load(Ordering::Relaxed), 1);
}
