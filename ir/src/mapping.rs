//! Value and block remapping used when cloning IR.

use std::collections::HashMap;

use crate::function::{BlockId, ValueId};

/// Maps values and blocks of cloned IR to their replacements.
#[derive(Debug, Clone, Default)]
pub struct IrMapping {
    values: HashMap<ValueId, ValueId>,
    blocks: HashMap<BlockId, BlockId>,
}

impl IrMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, from: ValueId, to: ValueId) {
        self.values.insert(from, to);
    }

    /// Pairwise mapping; both slices must have the same length.
    pub fn map_values(&mut self, from: &[ValueId], to: &[ValueId]) {
        debug_assert_eq!(from.len(), to.len(), "mapping slices of different length");
        self.values.extend(from.iter().copied().zip(to.iter().copied()));
    }

    pub fn map_block(&mut self, from: BlockId, to: BlockId) {
        self.blocks.insert(from, to);
    }

    pub fn lookup(&self, value: ValueId) -> Option<ValueId> {
        self.values.get(&value).copied()
    }

    /// Mapped value, or `value` itself when unmapped.
    pub fn lookup_or_default(&self, value: ValueId) -> ValueId {
        self.lookup(value).unwrap_or(value)
    }

    pub fn lookup_block(&self, block: BlockId) -> Option<BlockId> {
        self.blocks.get(&block).copied()
    }

    pub fn contains(&self, value: ValueId) -> bool {
        self.values.contains_key(&value)
    }
}
