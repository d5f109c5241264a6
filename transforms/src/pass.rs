//! Function passes and pipelines.

use kiln_ir::{Diagnostics, Function};
use snafu::{ResultExt, ensure};
use tracing::{debug, trace};

use crate::error::*;
use crate::registry::registry;

/// A transformation over one function.
///
/// A failing pass must leave the function as it found it.
pub trait Pass: Send + Sync {
    /// Name the pass is registered and parsed under.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn run(&self, func: &mut Function, diagnostics: &mut Diagnostics) -> kiln_ir::Result<()>;
}

/// Ordered pipeline of passes.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn add_boxed(&mut self, pass: Box<dyn Pass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Build a pipeline from a comma-separated list of registered pass names.
    pub fn parse(pipeline: &str) -> Result<Self> {
        let mut manager = Self::new();
        for name in pipeline.split(',').map(str::trim) {
            ensure!(!name.is_empty(), EmptyPassNameSnafu { pipeline });
            manager.add_boxed(registry().create(name)?);
        }
        Ok(manager)
    }

    /// Names of the passes in pipeline order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass in order, stopping at the first failure.
    #[tracing::instrument(skip_all, fields(func = func.name(), passes = self.passes.len()))]
    pub fn run(&self, func: &mut Function, diagnostics: &mut Diagnostics) -> Result<()> {
        for pass in &self.passes {
            debug!(pass = pass.name(), "running pass");
            pass.run(func, diagnostics).context(PassFailedSnafu { pass: pass.name(), func: func.name() })?;
            trace!(pass = pass.name(), ir = %func.tree(), "after pass");
        }
        Ok(())
    }
}

impl std::fmt::Debug for PassManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassManager").field("passes", &self.pass_names()).finish()
    }
}
