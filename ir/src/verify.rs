//! Structural verification.
//!
//! Checks the invariants the builder and the rewrite engine rely on:
//!
//! - region blocks end with the terminator their owner expects, and terminators
//!   appear nowhere else;
//! - every operand is defined by a live op or block argument that is visible from
//!   the use (earlier in the same block or in an enclosing block);
//! - loads and stores carry one index per buffer axis;
//! - parallel loops have matching bound segments and one init per result;
//! - reductions live directly in a parallel body and have a well-formed body.

use kiln_dtype::DType;
use snafu::ensure;

use crate::error::*;
use crate::function::{BlockId, Function, OpId, ValueDef, ValueId};
use crate::op::{Op, OpKey};
use crate::shape::Type;

/// Verify `func`, returning the first violation found.
pub fn verify(func: &Function) -> Result<()> {
    verify_block_terminators(func, func.entry_block(), Some(OpKey::Return), None)?;
    for op in func.walk() {
        verify_op(func, op)?;
    }
    Ok(())
}

fn fail<T>(op: OpId, op_name: &'static str, message: impl Into<String>) -> Result<T> {
    VerificationSnafu { op, op_name, message: message.into() }.fail()
}

fn verify_block_terminators(func: &Function, block: BlockId, expected: Option<OpKey>, owner: Option<OpId>) -> Result<()> {
    let ops: Vec<OpId> = func.block(block).ops.iter().copied().filter(|o| func.is_live(*o)).collect();
    for (position, op) in ops.iter().enumerate() {
        let key = func.get(*op)?.op.key();
        if key.is_terminator() && position + 1 != ops.len() {
            return fail(*op, key.name(), "terminator is not the last op of its block");
        }
    }

    let Some(expected) = expected else { return Ok(()) };
    let last = ops.last().map(|o| func.get(*o).map(|operation| operation.op.key())).transpose()?;
    if last != Some(expected) {
        let (op, op_name) = match owner {
            Some(owner) => (owner, func.get(owner)?.op.name()),
            None => (ops.last().copied().unwrap_or(OpId(0)), "func"),
        };
        return fail(op, op_name, format!("block {block} must end with '{}'", expected.name()));
    }
    Ok(())
}

fn verify_op(func: &Function, id: OpId) -> Result<()> {
    let operation = func.get(id)?;
    let key = operation.op.key();
    let name = key.name();

    for operand in &operation.operands {
        if !is_visible(func, *operand, id) {
            return fail(id, name, format!("operand {operand} is not defined before its use"));
        }
    }

    ensure!(
        operation.regions.len() == key.num_regions(),
        VerificationSnafu { op: id, op_name: name, message: format!("expected {} region(s)", key.num_regions()) }
    );
    for region in &operation.regions {
        for block in &func.region(*region).blocks {
            verify_block_terminators(func, *block, key.region_terminator(), Some(id))?;
        }
    }

    let operand_type = |index: usize| func.value_type(operation.operands[index]);
    match &operation.op {
        Op::Binary(_) | Op::Cmp(_) => {
            ensure_arity(id, name, operation.operands.len(), 2)?;
            if operand_type(0) != operand_type(1) {
                return fail(id, name, format!("operand types differ: {} vs {}", operand_type(0), operand_type(1)));
            }
            if let Op::Binary(op) = operation.op
                && op.is_bitwise()
                && operand_type(0).element().is_float()
            {
                return fail(id, name, format!("'{op}' is not defined on {}", operand_type(0)));
            }
        }
        Op::Select => {
            ensure_arity(id, name, operation.operands.len(), 3)?;
            if operand_type(0) != &Type::bool_() {
                return fail(id, name, "condition must be i1");
            }
        }
        Op::Dim { axis } => {
            ensure_arity(id, name, operation.operands.len(), 1)?;
            let rank = memref_rank(func, id, name, operation.operands[0])?;
            if *axis >= rank {
                return fail(id, name, format!("axis {axis} out of range for rank {rank}"));
            }
        }
        Op::Load | Op::Store => {
            let memref_index = if matches!(operation.op, Op::Load) { 0 } else { 1 };
            let rank = match operation.operands.get(memref_index) {
                Some(memref) => memref_rank(func, id, name, *memref)?,
                None => return fail(id, name, "missing buffer operand"),
            };
            let indices = &operation.operands[memref_index + 1..];
            if indices.len() != rank {
                return fail(id, name, format!("expected {rank} index operand(s), got {}", indices.len()));
            }
            if let Some(bad) = indices.iter().find(|v| func.value_type(**v) != &Type::index()) {
                return fail(id, name, format!("index operand {bad} is not of index type"));
            }
        }
        Op::Parallel { num_loops } => {
            let expected = 3 * num_loops + operation.results.len();
            ensure_arity(id, name, operation.operands.len(), expected)?;
            let body = func.region_block(id, 0)?;
            let args = &func.block(body).args;
            if args.len() != *num_loops || args.iter().any(|a| func.value_type(*a) != &Type::index()) {
                return fail(id, name, format!("body must take {num_loops} index argument(s)"));
            }
        }
        Op::Reduce => {
            ensure_arity(id, name, operation.operands.len(), 1)?;
            if func.parent_op(id).and_then(|p| func.op(p)).map(|p| p.op.key()) != Some(OpKey::Parallel) {
                return fail(id, name, "must be nested directly in a parallel loop body");
            }
            let body = func.region_block(id, 0)?;
            let args = &func.block(body).args;
            let elem = operand_type(0);
            if args.len() != 2 || args.iter().any(|a| func.value_type(*a) != elem) {
                return fail(id, name, format!("body must take (element, accumulator) of type {elem}"));
            }
            if let Some(ret) = func.block(body).ops.last().and_then(|o| func.op(*o))
                && ret.operands.first().map(|v| func.value_type(*v)) != Some(elem)
            {
                return fail(id, name, format!("body must return a value of type {elem}"));
            }
        }
        Op::If => {
            ensure_arity(id, name, operation.operands.len(), 1)?;
            if operand_type(0) != &Type::Scalar(DType::Bool) {
                return fail(id, name, "condition must be i1");
            }
        }
        Op::BufferReduce(attrs) => {
            ensure_arity(id, name, operation.operands.len(), 3 * attrs.num_inputs)?;
            verify_buffer_body(func, id, name, 3 * attrs.num_inputs)?;
        }
        Op::BufferReduceWindow(_) => {
            ensure_arity(id, name, operation.operands.len(), 3)?;
            verify_buffer_body(func, id, name, 3)?;
        }
        Op::BufferBinary(_) => ensure_arity(id, name, operation.operands.len(), 3)?,
        Op::Const(_) | Op::Alloc | Op::ReduceReturn | Op::Yield | Op::BufferTerminator | Op::Return => {}
    }
    Ok(())
}

fn ensure_arity(op: OpId, op_name: &'static str, actual: usize, expected: usize) -> Result<()> {
    ensure!(
        actual == expected,
        VerificationSnafu { op, op_name, message: format!("expected {expected} operand(s), got {actual}") }
    );
    Ok(())
}

fn memref_rank(func: &Function, op: OpId, op_name: &'static str, value: ValueId) -> Result<usize> {
    match func.value_type(value).as_memref() {
        Some(memref) => Ok(memref.rank()),
        None => fail(op, op_name, format!("operand {value} is not a buffer")),
    }
}

fn verify_buffer_body(func: &Function, op: OpId, op_name: &'static str, num_args: usize) -> Result<()> {
    let body = func.region_block(op, 0)?;
    let args = &func.block(body).args;
    let rank_zero = args.iter().all(|a| func.value_type(*a).as_memref().is_some_and(|m| m.rank() == 0));
    if args.len() != num_args || !rank_zero {
        return fail(op, op_name, format!("body must take {num_args} rank-0 buffer argument(s)"));
    }
    Ok(())
}

/// True when `value` is usable by `user`: a block argument of an enclosing block, or
/// the result of a live op that precedes `user` (or its enclosing op) in a shared block.
fn is_visible(func: &Function, value: ValueId, user: OpId) -> bool {
    if !func.is_live(user) {
        return false;
    }
    let mut anchor = user;
    loop {
        let Some(block) = func.op(anchor).and_then(|o| o.parent) else { return false };
        match func.value(value).def {
            ValueDef::BlockArg { block: def_block, .. } if def_block == block => return true,
            ValueDef::OpResult { op: def, .. } if func.op(def).and_then(|o| o.parent) == Some(block) => {
                let ops = &func.block(block).ops;
                let position = |o: OpId| ops.iter().position(|x| *x == o);
                return matches!((position(def), position(anchor)), (Some(d), Some(a)) if d < a);
            }
            _ => {}
        }
        match func.block_parent_op(block) {
            Some(parent) => anchor = parent,
            None => return false,
        }
    }
}
