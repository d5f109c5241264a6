use std::collections::HashSet;

use crate::op::{OpFamily, OpKey};

/// Legality of an op kind under a [`ConversionTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    Legal,
    Illegal,
    /// Neither declared legal nor illegal; left alone by partial conversion.
    Unknown,
}

/// Declares which ops may remain after conversion.
///
/// Explicitly illegal ops take precedence over a legal family.
#[derive(Debug, Clone, Default)]
pub struct ConversionTarget {
    legal_families: HashSet<OpFamily>,
    legal_ops: HashSet<OpKey>,
    illegal_ops: HashSet<OpKey>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_legal_family(&mut self, family: OpFamily) -> &mut Self {
        self.legal_families.insert(family);
        self
    }

    pub fn add_legal_op(&mut self, key: OpKey) -> &mut Self {
        self.illegal_ops.remove(&key);
        self.legal_ops.insert(key);
        self
    }

    pub fn add_illegal_op(&mut self, key: OpKey) -> &mut Self {
        self.legal_ops.remove(&key);
        self.illegal_ops.insert(key);
        self
    }

    pub fn legality(&self, key: OpKey) -> Legality {
        if self.illegal_ops.contains(&key) {
            Legality::Illegal
        } else if self.legal_ops.contains(&key) || self.legal_families.contains(&key.family()) {
            Legality::Legal
        } else {
            Legality::Unknown
        }
    }

    pub fn is_illegal(&self, key: OpKey) -> bool {
        self.legality(key) == Legality::Illegal
    }
}
