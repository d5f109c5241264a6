//! Scalar evaluation on `ConstValue`.
//!
//! Shared by the interpreter. All operations follow Rust semantics: integer
//! arithmetic wraps, floats follow IEEE 754. Results are not normalized to a
//! storage width; callers `cast` them to the result dtype.

use kiln_dtype::DType;

use crate::types::{BinaryOp, CmpPredicate, ConstValue};

/// Evaluate a binary operation.
///
/// Returns `None` if the operand kinds differ or the operation is undefined for
/// them (bitwise ops on floats).
pub fn eval_binary_op(op: BinaryOp, a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match op {
        BinaryOp::Add => eval_add(a, b),
        BinaryOp::Sub => eval_sub(a, b),
        BinaryOp::Mul => eval_mul(a, b),
        BinaryOp::Max => eval_max(a, b),
        BinaryOp::Min => eval_min(a, b),
        BinaryOp::And => eval_and(a, b),
        BinaryOp::Or => eval_or(a, b),
    }
}

/// Evaluate a comparison on operands of `dtype`.
///
/// Unsigned predicates reinterpret integers at the full width of `dtype`, so
/// `-1 <u 4` is false. Floats only accept the signed (ordered) predicates.
pub fn eval_cmp(predicate: CmpPredicate, a: ConstValue, b: ConstValue, dtype: DType) -> Option<bool> {
    use std::cmp::Ordering;

    let ordering = match (a, b) {
        (ConstValue::Float(x), ConstValue::Float(y)) => {
            if predicate.is_unsigned() {
                return None;
            }
            // Unordered (NaN) compares false for everything but `ne`.
            let Some(ordering) = x.partial_cmp(&y) else { return Some(predicate == CmpPredicate::Ne) };
            ordering
        }
        (ConstValue::Bool(x), ConstValue::Bool(y)) => x.cmp(&y),
        (ConstValue::Int(x), ConstValue::Int(y)) if predicate.is_unsigned() => {
            to_unsigned(x, dtype).cmp(&to_unsigned(y, dtype))
        }
        (ConstValue::Int(x), ConstValue::Int(y)) => x.cmp(&y),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => x.cmp(&y),
        _ => return None,
    };

    Some(match predicate {
        CmpPredicate::Eq => ordering == Ordering::Equal,
        CmpPredicate::Ne => ordering != Ordering::Equal,
        CmpPredicate::Slt | CmpPredicate::Ult => ordering == Ordering::Less,
        CmpPredicate::Sle | CmpPredicate::Ule => ordering != Ordering::Greater,
        CmpPredicate::Sgt | CmpPredicate::Ugt => ordering == Ordering::Greater,
        CmpPredicate::Sge | CmpPredicate::Uge => ordering != Ordering::Less,
    })
}

/// Reinterpret a signed value as unsigned at the bit width of `dtype`.
#[inline]
fn to_unsigned(v: i64, dtype: DType) -> u64 {
    match dtype.bits() {
        64 => v as u64,
        bits => (v as u64) & ((1u64 << bits) - 1),
    }
}

// ============================================================================
// Binary Operations
// ============================================================================

#[inline]
fn eval_add(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x.wrapping_add(y))),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x.wrapping_add(y))),
        (ConstValue::Float(x), ConstValue::Float(y)) => Some(ConstValue::Float(x + y)),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x ^ y)),
        _ => None,
    }
}

#[inline]
fn eval_sub(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x.wrapping_sub(y))),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x.wrapping_sub(y))),
        (ConstValue::Float(x), ConstValue::Float(y)) => Some(ConstValue::Float(x - y)),
        _ => None,
    }
}

#[inline]
fn eval_mul(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x.wrapping_mul(y))),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x.wrapping_mul(y))),
        (ConstValue::Float(x), ConstValue::Float(y)) => Some(ConstValue::Float(x * y)),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x & y)),
        _ => None,
    }
}

#[inline]
fn eval_max(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x.max(y))),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x.max(y))),
        (ConstValue::Float(x), ConstValue::Float(y)) => Some(ConstValue::Float(x.max(y))),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x | y)),
        _ => None,
    }
}

#[inline]
fn eval_min(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x.min(y))),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x.min(y))),
        (ConstValue::Float(x), ConstValue::Float(y)) => Some(ConstValue::Float(x.min(y))),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x & y)),
        _ => None,
    }
}

#[inline]
fn eval_and(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x & y)),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x & y)),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x & y)),
        _ => None,
    }
}

#[inline]
fn eval_or(a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => Some(ConstValue::Int(x | y)),
        (ConstValue::UInt(x), ConstValue::UInt(y)) => Some(ConstValue::UInt(x | y)),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(x | y)),
        _ => None,
    }
}
