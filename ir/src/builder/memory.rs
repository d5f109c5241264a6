//! Buffer allocation, size queries and element access.

use super::Builder;
use crate::function::ValueId;
use crate::op::Op;
use crate::shape::{MemRefType, Type};

impl Builder<'_> {
    pub fn alloc(&mut self, ty: MemRefType) -> ValueId {
        self.create_value(Op::Alloc, &[], Type::MemRef(ty))
    }

    /// Run-time extent of `axis` of `memref`.
    pub fn dim(&mut self, memref: ValueId, axis: usize) -> ValueId {
        self.create_value(Op::Dim { axis }, &[memref], Type::index())
    }

    pub fn load(&mut self, memref: ValueId, indices: &[ValueId]) -> ValueId {
        let elem = self.value_type(memref).element();
        let operands: Vec<ValueId> = std::iter::once(memref).chain(indices.iter().copied()).collect();
        self.create_value(Op::Load, &operands, Type::Scalar(elem))
    }

    pub fn store(&mut self, value: ValueId, memref: ValueId, indices: &[ValueId]) {
        let operands: Vec<ValueId> = [value, memref].into_iter().chain(indices.iter().copied()).collect();
        self.create(Op::Store, &operands, &[]);
    }
}
