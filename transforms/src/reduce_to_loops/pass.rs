use std::sync::Arc;

use kiln_ir::prelude::*;
use kiln_ir::rewrite::apply_partial_conversion;
use kiln_ir::{Diagnostics, Result};
use tracing::{debug, trace};

use super::{ReduceToParallelLoops, ReduceWindowToParallelLoops};
use crate::config::LoweringConfig;
use crate::pass::Pass;
use crate::registry::{PassRegistry, registry};

pub const PASS_NAME: &str = "lower-reduce-to-parallel-loops";
pub const PASS_DESCRIPTION: &str = "Lower buffer reduce and reduce_window ops to parallel loops.";

/// Converts every `buffer.reduce` and `buffer.reduce_window` of a function.
///
/// Either all of them are lowered or the function is left untouched and
/// [`Error::LegalizationFailed`](kiln_ir::Error::LegalizationFailed) is returned.
#[derive(Debug, Clone, Default)]
pub struct LowerReduceToParallelLoops {
    config: LoweringConfig,
}

impl LowerReduceToParallelLoops {
    pub fn new(config: LoweringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }

    /// Everything but the two buffer reductions may remain.
    pub fn target() -> ConversionTarget {
        let mut target = ConversionTarget::new();
        target
            .add_legal_family(OpFamily::Arith)
            .add_legal_family(OpFamily::Memory)
            .add_legal_family(OpFamily::Loop)
            .add_legal_family(OpFamily::Buffer)
            .add_legal_family(OpFamily::Func)
            .add_illegal_op(OpKey::BufferReduce)
            .add_illegal_op(OpKey::BufferReduceWindow);
        target
    }

    pub fn patterns(&self) -> PatternSet {
        let mut patterns = PatternSet::new();
        patterns.add(ReduceToParallelLoops::new()).add(ReduceWindowToParallelLoops::new(self.config.clone()));
        patterns
    }
}

impl Pass for LowerReduceToParallelLoops {
    fn name(&self) -> &'static str {
        PASS_NAME
    }

    fn description(&self) -> &'static str {
        PASS_DESCRIPTION
    }

    #[tracing::instrument(skip_all, fields(func = func.name()))]
    fn run(&self, func: &mut Function, diagnostics: &mut Diagnostics) -> Result<()> {
        trace!(ir = %func.tree(), "before lowering");
        let stats = apply_partial_conversion(func, &Self::target(), &self.patterns(), diagnostics)?;
        debug!(converted = stats.converted, "reductions lowered to parallel loops");
        trace!(ir = %func.tree(), "after lowering");
        Ok(())
    }
}

pub(crate) fn register_into(registry: &PassRegistry) {
    registry.register(
        PASS_NAME,
        PASS_DESCRIPTION,
        Arc::new(|| Box::new(LowerReduceToParallelLoops::new(LoweringConfig::from_env())) as Box<dyn Pass>),
    );
}

/// Register the lowering in the global registry under [`PASS_NAME`].
///
/// The global registry already carries it; calling this again is harmless.
pub fn register_reduce_lowering() {
    register_into(registry());
}
