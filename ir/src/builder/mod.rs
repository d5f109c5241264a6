//! IR construction.
//!
//! A [`Builder`] borrows a [`Function`] mutably and inserts new operations at its
//! current [`InsertPoint`]. Constructors are grouped by op family:
//!
//! - [`arith`] - constants, binary ops, comparisons, select
//! - [`memory`] - alloc, dim, load, store
//! - [`loops`] - parallel, reduce, if, yield
//! - [`buffer`] - buffer-level ops used to author inputs for lowering

pub mod arith;
pub mod buffer;
pub mod loops;
pub mod memory;

use crate::error::Result;
use crate::function::{BlockId, Function, OpId, ValueId};
use crate::mapping::IrMapping;
use crate::op::Op;
use crate::shape::Type;

pub use loops::{IfConstruct, ParallelLoop, ReduceConstruct};

/// Position inside a block where the next op is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    pub block: BlockId,
    pub index: usize,
}

pub struct Builder<'f> {
    func: &'f mut Function,
    ip: InsertPoint,
}

impl<'f> Builder<'f> {
    /// Builder appending to the end of `block`.
    pub fn at_end(func: &'f mut Function, block: BlockId) -> Self {
        let index = func.block(block).ops.len();
        Self { func, ip: InsertPoint { block, index } }
    }

    pub fn at_start(func: &'f mut Function, block: BlockId) -> Self {
        Self { func, ip: InsertPoint { block, index: 0 } }
    }

    /// Builder inserting right before `op`.
    pub fn before(func: &'f mut Function, op: OpId) -> Result<Self> {
        let (block, index) = func.position(op)?;
        Ok(Self { func, ip: InsertPoint { block, index } })
    }

    pub fn func(&self) -> &Function {
        &*self.func
    }

    pub(crate) fn func_mut(&mut self) -> &mut Function {
        &mut *self.func
    }

    pub fn insertion_point(&self) -> InsertPoint {
        self.ip
    }

    pub fn insertion_block(&self) -> BlockId {
        self.ip.block
    }

    pub fn set_insertion_point(&mut self, ip: InsertPoint) {
        self.ip = ip;
    }

    pub fn set_insertion_point_to_start(&mut self, block: BlockId) {
        self.ip = InsertPoint { block, index: 0 };
    }

    pub fn set_insertion_point_to_end(&mut self, block: BlockId) {
        self.ip = InsertPoint { block, index: self.func.block(block).ops.len() };
    }

    pub fn set_insertion_point_before(&mut self, op: OpId) -> Result<()> {
        let (block, index) = self.func.position(op)?;
        self.ip = InsertPoint { block, index };
        Ok(())
    }

    pub fn set_insertion_point_after(&mut self, op: OpId) -> Result<()> {
        let (block, index) = self.func.position(op)?;
        self.ip = InsertPoint { block, index: index + 1 };
        Ok(())
    }

    /// Insert an op at the insertion point and advance past it.
    ///
    /// Regions are created empty; constructors that need bodies add their blocks.
    pub fn create(&mut self, op: Op, operands: &[ValueId], result_types: &[Type]) -> OpId {
        let num_regions = op.key().num_regions();
        let id = self.func.insert_op(self.ip.block, self.ip.index, op, operands, result_types, num_regions);
        self.ip.index += 1;
        id
    }

    /// Create an op with a single result and return that result.
    pub(crate) fn create_value(&mut self, op: Op, operands: &[ValueId], result_type: Type) -> ValueId {
        let id = self.create(op, operands, std::slice::from_ref(&result_type));
        self.func.results_of(id)[0]
    }

    /// Append a block to region `region_index` of `op`.
    pub fn add_block(&mut self, op: OpId, region_index: usize, arg_types: impl IntoIterator<Item = Type>) -> BlockId {
        let region = self.func.regions_of(op)[region_index];
        self.func.new_block(region, arg_types)
    }

    pub fn value_type(&self, value: ValueId) -> &Type {
        self.func.value_type(value)
    }

    // ========================================================================
    // Cloning
    // ========================================================================

    /// Deep-clone `op` at the insertion point.
    ///
    /// Operands are remapped through `mapping` (unmapped values are used as is), and
    /// the results, nested blocks and block arguments of the clone are recorded in
    /// `mapping` so later clones see them.
    pub fn clone_op(&mut self, op: OpId, mapping: &mut IrMapping) -> Result<OpId> {
        let source = self.func.get(op)?.clone();
        let operands: Vec<ValueId> = source.operands.iter().map(|v| mapping.lookup_or_default(*v)).collect();
        let result_types: Vec<Type> = source.results.iter().map(|v| self.func.value_type(*v).clone()).collect();

        let clone = self.create(source.op.clone(), &operands, &result_types);
        let clone_results: Vec<ValueId> = self.func.results_of(clone).to_vec();
        mapping.map_values(&source.results, &clone_results);

        let saved = self.ip;
        for (region_index, region) in source.regions.iter().enumerate() {
            let blocks = self.func.region(*region).blocks.clone();
            for block in blocks {
                let source_block = self.func.block(block).clone();
                let arg_types: Vec<Type> = source_block.args.iter().map(|a| self.func.value_type(*a).clone()).collect();
                let new_block = self.add_block(clone, region_index, arg_types);
                mapping.map_block(block, new_block);
                let new_args: Vec<ValueId> = self.func.block(new_block).args.to_vec();
                mapping.map_values(&source_block.args, &new_args);

                self.set_insertion_point_to_end(new_block);
                let live: Vec<OpId> = source_block.ops.iter().copied().filter(|o| self.func.is_live(*o)).collect();
                for nested in live {
                    self.clone_op(nested, mapping)?;
                }
            }
        }
        self.ip = saved;
        Ok(clone)
    }
}
