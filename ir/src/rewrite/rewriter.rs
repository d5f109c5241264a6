use std::ops::{Deref, DerefMut};

use snafu::ensure;

use crate::builder::Builder;
use crate::diagnostic::Diagnostics;
use crate::error::*;
use crate::function::{Function, OpId, ValueId};

/// Builder handed to conversion patterns.
///
/// Dereferences to [`Builder`] for op construction and adds replacement, erasure
/// and diagnostic reporting.
pub struct Rewriter<'a> {
    builder: Builder<'a>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Rewriter<'a> {
    /// Rewriter inserting right before `op`.
    pub fn before(func: &'a mut Function, op: OpId, diagnostics: &'a mut Diagnostics) -> Result<Self> {
        Ok(Self { builder: Builder::before(func, op)?, diagnostics })
    }

    /// Redirect all uses of `op`'s results to `values`, then erase `op`.
    pub fn replace_op(&mut self, op: OpId, values: &[ValueId]) -> Result<()> {
        let operation = self.func().get(op)?;
        let op_name = operation.op.name();
        let results = operation.results.clone();
        ensure!(
            results.len() == values.len(),
            VerificationSnafu {
                op,
                op_name,
                message: format!("replacing {} result(s) with {} value(s)", results.len(), values.len())
            }
        );
        for (from, to) in results.iter().zip(values) {
            self.func_mut().replace_all_uses(*from, *to);
        }
        self.erase_op(op)
    }

    pub fn erase_op(&mut self, op: OpId) -> Result<()> {
        self.func_mut().erase_op(op)
    }

    pub fn op_name(&self, op: OpId) -> &'static str {
        self.func().op(op).map_or("<erased>", |o| o.op.name())
    }

    pub fn emit_error(&mut self, op: OpId, message: impl Into<String>) {
        let op_name = self.op_name(op);
        self.diagnostics.error(op, op_name, message);
    }

    pub fn emit_warning(&mut self, op: OpId, message: impl Into<String>) {
        let op_name = self.op_name(op);
        self.diagnostics.warning(op, op_name, message);
    }

    pub fn emit_remark(&mut self, op: OpId, message: impl Into<String>) {
        let op_name = self.op_name(op);
        self.diagnostics.remark(op, op_name, message);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &*self.diagnostics
    }
}

impl<'a> Deref for Rewriter<'a> {
    type Target = Builder<'a>;

    fn deref(&self) -> &Self::Target {
        &self.builder
    }
}

impl DerefMut for Rewriter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.builder
    }
}
