//! Process-wide pass registry.
//!
//! Passes are registered under a unique name together with a factory, so pipelines
//! can be assembled from strings (see [`PassManager::parse`](crate::PassManager::parse)).

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, UnknownPassSnafu};
use crate::pass::Pass;

/// Creates a fresh instance of a pass.
pub type PassFactory = Arc<dyn Fn() -> Box<dyn Pass> + Send + Sync>;

/// Registered pass metadata.
#[derive(Clone)]
pub struct PassInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: PassFactory,
}

impl std::fmt::Debug for PassInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassInfo").field("name", &self.name).field("description", &self.description).finish()
    }
}

/// Name-indexed pass factories.
///
/// Uses `parking_lot::RwLock`: lookups take a read lock, registration a write lock.
#[derive(Default)]
pub struct PassRegistry {
    passes: RwLock<HashMap<&'static str, PassInfo>>,
}

impl PassRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in passes registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::reduce_to_loops::register_into(&registry);
        registry
    }

    /// Register `factory` under `name`, replacing any earlier registration.
    pub fn register(&self, name: &'static str, description: &'static str, factory: PassFactory) {
        debug!(name, "registering pass");
        self.passes.write().insert(name, PassInfo { name, description, factory });
    }

    /// Instantiate the pass registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Pass>> {
        let factory = self.passes.read().get(name).map(|info| Arc::clone(&info.factory));
        match factory {
            Some(factory) => Ok(factory()),
            None => UnknownPassSnafu { name, available: self.names().join(", ") }.fail(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.read().contains_key(name)
    }

    pub fn info(&self, name: &str) -> Option<PassInfo> {
        self.passes.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.read().keys().copied().sorted().collect()
    }
}

static PASS_REGISTRY: Lazy<PassRegistry> = Lazy::new(PassRegistry::with_builtins);

/// The global pass registry, pre-populated with the built-in passes.
pub fn registry() -> &'static PassRegistry {
    &PASS_REGISTRY
}
