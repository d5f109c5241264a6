use std::collections::HashMap;

use crate::function::OpId;
use crate::op::OpKey;

use super::Rewriter;

/// Result of applying a conversion pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteResult {
    /// Pattern declined. The IR must be left untouched.
    NoMatch,
    /// Pattern replaced or erased its root op.
    Rewritten,
}

/// Rewrites one illegal op kind into legal IR.
///
/// Implementations must decide whether they apply before mutating anything, so a
/// decline leaves the function exactly as it was.
pub trait ConversionPattern: Send + Sync {
    fn name(&self) -> &'static str;

    /// Op kind this pattern is rooted at.
    fn root(&self) -> OpKey;

    /// Try to rewrite `op`. The rewriter's insertion point is right before `op`.
    fn match_and_rewrite(&self, op: OpId, rewriter: &mut Rewriter<'_>) -> RewriteResult;
}

/// Conversion patterns indexed by root op kind.
#[derive(Default)]
pub struct PatternSet {
    indexed: HashMap<OpKey, Vec<Box<dyn ConversionPattern>>>,
    len: usize,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: impl ConversionPattern + 'static) -> &mut Self {
        self.indexed.entry(pattern.root()).or_default().push(Box::new(pattern));
        self.len += 1;
        self
    }

    /// Patterns rooted at `key`, in insertion order.
    pub fn for_key(&self, key: OpKey) -> &[Box<dyn ConversionPattern>] {
        self.indexed.get(&key).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.indexed.values().flatten().map(|p| p.name()).collect();
        f.debug_struct("PatternSet").field("patterns", &names).finish()
    }
}
