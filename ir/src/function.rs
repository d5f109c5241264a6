//! Arena-backed function body.
//!
//! All IR entities live in flat vectors owned by [`Function`] and are addressed by
//! typed ids. Erasing an operation leaves a tombstone so ids stay stable, which lets
//! a snapshot (a plain clone) be restored without invalidating ids held elsewhere.

use std::fmt;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::op::{Op, OpKey};
use crate::shape::Type;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Operation handle.
    OpId,
    "op"
);
define_id!(
    /// Block handle.
    BlockId,
    "^bb"
);
define_id!(
    /// Region handle.
    RegionId,
    "region"
);
define_id!(
    /// SSA value handle.
    ValueId,
    "%"
);

/// An operation instance.
#[derive(Debug, Clone)]
pub struct Operation {
    pub op: Op,
    pub operands: SmallVec<[ValueId; 4]>,
    pub results: SmallVec<[ValueId; 2]>,
    pub regions: SmallVec<[RegionId; 2]>,
    /// Containing block; `None` while detached.
    pub parent: Option<BlockId>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub args: SmallVec<[ValueId; 4]>,
    pub ops: Vec<OpId>,
    pub parent: RegionId,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub blocks: SmallVec<[BlockId; 1]>,
    /// Owning op; `None` for the function body.
    pub parent: Option<OpId>,
}

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    OpResult { op: OpId, index: usize },
    BlockArg { block: BlockId, index: usize },
}

#[derive(Debug, Clone)]
pub struct ValueInfo {
    pub ty: Type,
    pub def: ValueDef,
}

/// A function: one body region with a single entry block whose arguments are the
/// function parameters.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    ops: Vec<Option<Operation>>,
    blocks: Vec<Block>,
    regions: Vec<Region>,
    values: Vec<ValueInfo>,
    body: RegionId,
}

impl Function {
    pub fn new(name: impl Into<String>, arg_types: impl IntoIterator<Item = Type>) -> Self {
        let mut func = Self {
            name: name.into(),
            ops: Vec::new(),
            blocks: Vec::new(),
            regions: Vec::new(),
            values: Vec::new(),
            body: RegionId(0),
        };
        let body = func.new_region(None);
        func.body = body;
        func.new_block(body, arg_types);
        func
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> RegionId {
        self.body
    }

    pub fn entry_block(&self) -> BlockId {
        self.regions[self.body.index()].blocks[0]
    }

    pub fn arguments(&self) -> &[ValueId] {
        &self.blocks[self.entry_block().index()].args
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Live operation, or `None` once erased.
    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get(&self, id: OpId) -> Result<&Operation> {
        self.op(id).context(OpErasedSnafu { op: id })
    }

    pub(crate) fn get_mut(&mut self, id: OpId) -> Result<&mut Operation> {
        self.ops.get_mut(id.index()).and_then(Option::as_mut).context(OpErasedSnafu { op: id })
    }

    pub fn is_live(&self, id: OpId) -> bool {
        self.op(id).is_some()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn value(&self, id: ValueId) -> &ValueInfo {
        &self.values[id.index()]
    }

    pub fn value_type(&self, id: ValueId) -> &Type {
        &self.values[id.index()].ty
    }

    /// Results of `op`; empty once erased.
    pub fn results_of(&self, op: OpId) -> &[ValueId] {
        self.op(op).map_or(&[], |o| o.results.as_slice())
    }

    pub fn operands_of(&self, op: OpId) -> &[ValueId] {
        self.op(op).map_or(&[], |o| o.operands.as_slice())
    }

    pub fn regions_of(&self, op: OpId) -> &[RegionId] {
        self.op(op).map_or(&[], |o| o.regions.as_slice())
    }

    /// Result `index` of `op`.
    pub fn result(&self, op: OpId, index: usize) -> Result<ValueId> {
        let operation = self.get(op)?;
        operation.results.get(index).copied().context(VerificationSnafu {
            op,
            op_name: operation.op.name(),
            message: format!("no result #{index}"),
        })
    }

    /// First block of region `index` of `op`.
    pub fn region_block(&self, op: OpId, index: usize) -> Result<BlockId> {
        let operation = self.get(op)?;
        operation.regions.get(index).and_then(|r| self.region(*r).blocks.first().copied()).context(
            VerificationSnafu { op, op_name: operation.op.name(), message: format!("no block in region #{index}") },
        )
    }

    /// Position of `op` inside its parent block.
    pub fn position(&self, op: OpId) -> Result<(BlockId, usize)> {
        let block = self.get(op)?.parent.context(OpDetachedSnafu { op })?;
        let index = self.block(block).ops.iter().position(|o| *o == op).context(OpDetachedSnafu { op })?;
        Ok((block, index))
    }

    /// Op owning the region that contains `block`, `None` for the function body.
    pub fn block_parent_op(&self, block: BlockId) -> Option<OpId> {
        self.region(self.block(block).parent).parent
    }

    /// Op whose region contains `op`.
    pub fn parent_op(&self, op: OpId) -> Option<OpId> {
        self.op(op).and_then(|o| o.parent).and_then(|b| self.block_parent_op(b))
    }

    /// True when `op` is `ancestor` or nested (transitively) inside it.
    pub fn is_nested_in(&self, op: OpId, ancestor: OpId) -> bool {
        let mut cursor = Some(op);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_op(current);
        }
        false
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Live ops of the function in pre-order (an op before the ops nested in it).
    pub fn walk(&self) -> Vec<OpId> {
        let mut out = Vec::new();
        self.walk_region_into(self.body, &mut out);
        out
    }

    /// Live ops nested inside `op` in pre-order, excluding `op` itself.
    pub fn walk_nested(&self, op: OpId) -> Vec<OpId> {
        let mut out = Vec::new();
        if let Some(operation) = self.op(op) {
            for region in &operation.regions {
                self.walk_region_into(*region, &mut out);
            }
        }
        out
    }

    fn walk_region_into(&self, region: RegionId, out: &mut Vec<OpId>) {
        for block in &self.region(region).blocks {
            for op in &self.block(*block).ops {
                let Some(operation) = self.op(*op) else { continue };
                out.push(*op);
                for nested in &operation.regions {
                    self.walk_region_into(*nested, out);
                }
            }
        }
    }

    /// Live ops that use `value` as an operand.
    pub fn uses_of(&self, value: ValueId) -> Vec<OpId> {
        self.walk().into_iter().filter(|op| self.op(*op).is_some_and(|o| o.operands.contains(&value))).collect()
    }

    /// Live ops of the given kind, pre-order.
    pub fn find_ops(&self, key: OpKey) -> Vec<OpId> {
        self.walk().into_iter().filter(|op| self.op(*op).is_some_and(|o| o.op.key() == key)).collect()
    }

    pub fn count_ops(&self, key: OpKey) -> usize {
        self.find_ops(key).len()
    }

    // ========================================================================
    // Mutation (builder/rewriter only)
    // ========================================================================

    pub(crate) fn new_value(&mut self, ty: Type, def: ValueDef) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueInfo { ty, def });
        id
    }

    pub(crate) fn new_region(&mut self, parent: Option<OpId>) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region { blocks: SmallVec::new(), parent });
        id
    }

    pub(crate) fn new_block(&mut self, region: RegionId, arg_types: impl IntoIterator<Item = Type>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block { args: SmallVec::new(), ops: Vec::new(), parent: region });
        let args = arg_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| self.new_value(ty, ValueDef::BlockArg { block: id, index }))
            .collect();
        self.blocks[id.index()].args = args;
        self.regions[region.index()].blocks.push(id);
        id
    }

    /// Create an op with `num_regions` empty regions and insert it at `index` of `block`.
    pub(crate) fn insert_op(
        &mut self,
        block: BlockId,
        index: usize,
        op: Op,
        operands: &[ValueId],
        result_types: &[Type],
        num_regions: usize,
    ) -> OpId {
        let id = OpId(self.ops.len() as u32);
        let results = result_types
            .iter()
            .enumerate()
            .map(|(index, ty)| self.new_value(ty.clone(), ValueDef::OpResult { op: id, index }))
            .collect();
        let regions = (0..num_regions).map(|_| self.new_region(Some(id))).collect();
        self.ops.push(Some(Operation { op, operands: operands.into(), results, regions, parent: Some(block) }));
        self.blocks[block.index()].ops.insert(index, id);
        id
    }

    /// Redirect every use of `from` to `to`.
    pub(crate) fn replace_all_uses(&mut self, from: ValueId, to: ValueId) {
        for operation in self.ops.iter_mut().flatten() {
            for operand in operation.operands.iter_mut().filter(|v| **v == from) {
                *operand = to;
            }
        }
    }

    /// Erase `op` and everything nested in it.
    ///
    /// Fails if a result is still used by an op outside of `op`.
    pub fn erase_op(&mut self, op: OpId) -> Result<()> {
        let operation = self.get(op)?;
        let op_name = operation.op.name();
        let uses = operation
            .results
            .iter()
            .flat_map(|r| self.uses_of(*r))
            .filter(|user| !self.is_nested_in(*user, op))
            .count();
        ensure!(uses == 0, EraseWithUsesSnafu { op_name, uses });

        let (block, index) = self.position(op)?;
        self.blocks[block.index()].ops.remove(index);
        for nested in self.walk_nested(op) {
            self.ops[nested.index()] = None;
        }
        self.ops[op.index()] = None;
        Ok(())
    }
}
