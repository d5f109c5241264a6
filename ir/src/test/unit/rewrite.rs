use kiln_dtype::DType;
use test_case::test_case;

use crate::builder::Builder;
use crate::diagnostic::{Diagnostics, Severity};
use crate::error::Error;
use crate::function::{Function, OpId};
use crate::interp::{HostBuffer, Interpreter};
use crate::op::{Op, OpFamily, OpKey};
use crate::rewrite::*;
use crate::test::fixtures::memref;
use crate::types::BinaryOp;

/// Lowers `buffer.binary` on rank-0 buffers to load/compute/store.
struct ScalarBufferBinary;

impl ConversionPattern for ScalarBufferBinary {
    fn name(&self) -> &'static str {
        "scalar-buffer-binary"
    }

    fn root(&self) -> OpKey {
        OpKey::BufferBinary
    }

    fn match_and_rewrite(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> RewriteResult {
        let Some(operation) = rewriter.func().op(op) else { return RewriteResult::NoMatch };
        let Op::BufferBinary(kind) = operation.op else { return RewriteResult::NoMatch };
        let operands = operation.operands.clone();
        let lhs = rewriter.load(operands[0], &[]);
        let rhs = rewriter.load(operands[1], &[]);
        let value = rewriter.binary(kind, lhs, rhs);
        rewriter.store(value, operands[2], &[]);
        match rewriter.erase_op(op) {
            Ok(()) => RewriteResult::Rewritten,
            Err(_) => RewriteResult::NoMatch,
        }
    }
}

struct AlwaysDecline;

impl ConversionPattern for AlwaysDecline {
    fn name(&self) -> &'static str {
        "always-decline"
    }

    fn root(&self) -> OpKey {
        OpKey::BufferBinary
    }

    fn match_and_rewrite(&self, _op: OpId, _rewriter: &mut Rewriter<'_>) -> RewriteResult {
        RewriteResult::NoMatch
    }
}

/// Claims success without touching the root.
struct ForgetfulPattern;

impl ConversionPattern for ForgetfulPattern {
    fn name(&self) -> &'static str {
        "forgetful"
    }

    fn root(&self) -> OpKey {
        OpKey::BufferBinary
    }

    fn match_and_rewrite(&self, _op: OpId, rewriter: &mut Rewriter<'_>) -> RewriteResult {
        rewriter.const_index(7);
        RewriteResult::Rewritten
    }
}

fn scalar_binary_function(count: usize) -> Function {
    let scalar = memref(&[], DType::Float32);
    let mut func = Function::new("scalar", [scalar.clone(), scalar.clone(), scalar]);
    let args = func.arguments().to_vec();
    let entry = func.entry_block();
    let mut b = Builder::at_end(&mut func, entry);
    for _ in 0..count {
        b.buffer_binary(BinaryOp::Add, args[0], args[1], args[2]);
    }
    b.return_();
    func
}

fn binary_target() -> ConversionTarget {
    let mut target = ConversionTarget::new();
    target
        .add_legal_family(OpFamily::Arith)
        .add_legal_family(OpFamily::Memory)
        .add_legal_family(OpFamily::Func)
        .add_illegal_op(OpKey::BufferBinary);
    target
}

fn scalar_args() -> Vec<HostBuffer> {
    vec![
        HostBuffer::from_values(&[], &[1.5f32]).unwrap(),
        HostBuffer::from_values(&[], &[2.0f32]).unwrap(),
        HostBuffer::zeros(&[], DType::Float32),
    ]
}

#[test_case(OpKey::BufferBinary, Legality::Illegal; "explicit illegal wins over family")]
#[test_case(OpKey::Load, Legality::Legal; "legal family")]
#[test_case(OpKey::Parallel, Legality::Unknown; "undeclared")]
fn test_target_legality(key: OpKey, expected: Legality) {
    let mut target = binary_target();
    target.add_legal_family(OpFamily::Buffer);
    assert_eq!(target.legality(key), expected);
}

#[test]
fn test_target_last_declaration_wins() {
    let mut target = ConversionTarget::new();
    target.add_illegal_op(OpKey::Store).add_legal_op(OpKey::Store);
    assert_eq!(target.legality(OpKey::Store), Legality::Legal);
}

#[test]
fn test_pattern_set_indexing() {
    let mut patterns = PatternSet::new();
    assert!(patterns.is_empty());
    patterns.add(ScalarBufferBinary).add(AlwaysDecline);
    assert_eq!(patterns.len(), 2);
    let names: Vec<_> = patterns.for_key(OpKey::BufferBinary).iter().map(|p| p.name()).collect();
    assert_eq!(names, ["scalar-buffer-binary", "always-decline"]);
    assert!(patterns.for_key(OpKey::BufferReduce).is_empty());
}

#[test_case(1; "single op")]
#[test_case(3; "several ops")]
fn test_conversion_succeeds(count: usize) {
    let mut func = scalar_binary_function(count);
    let expected = Interpreter::run(&func, scalar_args()).unwrap();

    let mut patterns = PatternSet::new();
    patterns.add(AlwaysDecline).add(ScalarBufferBinary);
    let mut diagnostics = Diagnostics::new();
    let stats = apply_partial_conversion(&mut func, &binary_target(), &patterns, &mut diagnostics).unwrap();

    assert_eq!(stats, ConversionStats { attempted: count, converted: count });
    assert_eq!(func.count_ops(OpKey::BufferBinary), 0);
    assert_eq!(func.count_ops(OpKey::Store), count);
    assert!(diagnostics.is_empty());
    crate::verify::verify(&func).unwrap();
    assert_eq!(Interpreter::run(&func, scalar_args()).unwrap()[2].to_f64(), expected[2].to_f64());
}

#[test]
fn test_failed_conversion_restores_function() {
    let mut func = scalar_binary_function(2);
    let before = func.tree();

    let mut patterns = PatternSet::new();
    patterns.add(AlwaysDecline);
    let mut diagnostics = Diagnostics::new();
    let err = apply_partial_conversion(&mut func, &binary_target(), &patterns, &mut diagnostics).unwrap_err();

    assert!(matches!(err, Error::LegalizationFailed { op_name: "buffer.binary", unconverted: 2 }));
    assert_eq!(func.tree(), before);
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.with_severity(Severity::Error).count(), 1);
}

#[test]
fn test_root_must_be_replaced() {
    let mut func = scalar_binary_function(1);
    let before = func.tree();

    let mut patterns = PatternSet::new();
    patterns.add(ForgetfulPattern);
    let mut diagnostics = Diagnostics::new();
    let err = apply_partial_conversion(&mut func, &binary_target(), &patterns, &mut diagnostics).unwrap_err();

    assert!(matches!(err, Error::RootNotReplaced { pattern: "forgetful" }));
    assert_eq!(func.tree(), before);
}

#[test]
fn test_unknown_ops_are_left_alone() {
    let mut func = scalar_binary_function(1);
    let mut diagnostics = Diagnostics::new();
    let stats = apply_partial_conversion(&mut func, &ConversionTarget::new(), &PatternSet::new(), &mut diagnostics).unwrap();
    assert_eq!(stats, ConversionStats::default());
    assert_eq!(func.count_ops(OpKey::BufferBinary), 1);
}

#[test]
fn test_replace_op_rejects_arity_mismatch() {
    let mut func = scalar_binary_function(0);
    let entry = func.entry_block();
    let constant = {
        let mut b = Builder::at_start(&mut func, entry);
        let value = b.const_index(1);
        func_op_of(b.func(), value)
    };
    let mut diagnostics = Diagnostics::new();
    let mut rewriter = Rewriter::before(&mut func, constant, &mut diagnostics).unwrap();
    assert!(matches!(rewriter.replace_op(constant, &[]), Err(Error::Verification { .. })));
}

fn func_op_of(func: &Function, value: crate::function::ValueId) -> OpId {
    match func.value(value).def {
        crate::function::ValueDef::OpResult { op, .. } => op,
        crate::function::ValueDef::BlockArg { .. } => panic!("expected an op result"),
    }
}
