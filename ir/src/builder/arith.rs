//! Scalar arithmetic constructors.

use kiln_dtype::DType;

use super::Builder;
use crate::function::ValueId;
use crate::op::Op;
use crate::shape::Type;
use crate::types::{BinaryOp, CmpPredicate, ConstValue};

impl Builder<'_> {
    /// Scalar constant, normalized to `dtype`.
    pub fn constant(&mut self, value: impl Into<ConstValue>, dtype: DType) -> ValueId {
        let value = value.into().cast(dtype);
        self.create_value(Op::Const(value), &[], Type::Scalar(dtype))
    }

    pub fn const_index(&mut self, value: i64) -> ValueId {
        self.constant(value, DType::Index)
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.constant(value, DType::Bool)
    }

    /// `lhs op rhs`, typed like `lhs`.
    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.value_type(lhs).clone();
        self.create_value(Op::Binary(op), &[lhs, rhs], ty)
    }

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn and(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::And, lhs, rhs)
    }

    pub fn cmp(&mut self, predicate: CmpPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.create_value(Op::Cmp(predicate), &[lhs, rhs], Type::bool_())
    }

    pub fn select(&mut self, cond: ValueId, on_true: ValueId, on_false: ValueId) -> ValueId {
        let ty = self.value_type(on_true).clone();
        self.create_value(Op::Select, &[cond, on_true, on_false], ty)
    }
}
