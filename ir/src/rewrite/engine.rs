//! Partial conversion driver.
//!
//! Ops are visited in pre-order. Each illegal op is handed to the patterns rooted
//! at its kind until one rewrites it. Ops nested inside a rewritten op disappear
//! with it and are skipped. Once the worklist drains, the function is rescanned so
//! illegal ops produced by earlier rewrites get their turn too; every op is
//! attempted at most once.
//!
//! If any illegal op could not be converted the function is restored to its
//! state before the call and [`Error::LegalizationFailed`] is returned.

use std::collections::HashSet;

use snafu::ensure;
use tracing::{debug, trace};

use crate::diagnostic::Diagnostics;
use crate::error::*;
use crate::function::{Function, OpId};

use super::{ConversionTarget, PatternSet, RewriteResult, Rewriter};

/// Stage of the conversion driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Looking for the next illegal op.
    Scanning,
    /// Running the patterns of one illegal op.
    Converting(OpId),
}

/// Outcome counters of a successful conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Illegal ops handed to patterns.
    pub attempted: usize,
    /// Illegal ops rewritten.
    pub converted: usize,
}

/// Convert every illegal op of `func` with `patterns`.
///
/// Ops whose legality is unknown are left alone. On failure the function is left
/// exactly as it was before the call.
#[tracing::instrument(skip_all, fields(func = func.name(), patterns = patterns.len()))]
pub fn apply_partial_conversion(
    func: &mut Function,
    target: &ConversionTarget,
    patterns: &PatternSet,
    diagnostics: &mut Diagnostics,
) -> Result<ConversionStats> {
    let snapshot = func.clone();
    let result = drive(func, target, patterns, diagnostics);
    if result.is_err() {
        *func = snapshot;
    }
    result
}

fn drive(
    func: &mut Function,
    target: &ConversionTarget,
    patterns: &PatternSet,
    diagnostics: &mut Diagnostics,
) -> Result<ConversionStats> {
    let mut stats = ConversionStats::default();
    let mut attempted = HashSet::new();
    let mut failed = Vec::new();
    let mut worklist: Vec<OpId> = Vec::new();
    let mut stage = Stage::Scanning;

    loop {
        stage = match stage {
            Stage::Scanning => {
                if worklist.is_empty() {
                    worklist = func
                        .walk()
                        .into_iter()
                        .filter(|op| !attempted.contains(op))
                        .filter(|op| func.op(*op).is_some_and(|o| target.is_illegal(o.op.key())))
                        .rev()
                        .collect();
                    if worklist.is_empty() {
                        break;
                    }
                }
                match worklist.pop() {
                    Some(op) if func.is_live(op) => Stage::Converting(op),
                    _ => Stage::Scanning,
                }
            }
            Stage::Converting(op) => {
                attempted.insert(op);
                stats.attempted += 1;
                if try_patterns(func, op, patterns, diagnostics)? {
                    stats.converted += 1;
                } else {
                    failed.push(op);
                }
                Stage::Scanning
            }
        };
    }

    if let Some(&first) = failed.first() {
        let op_name = func.get(first)?.op.name();
        diagnostics.error(first, op_name, "failed to legalize operation");
        return LegalizationFailedSnafu { op_name, unconverted: failed.len() }.fail();
    }

    debug!(attempted = stats.attempted, converted = stats.converted, "conversion complete");
    Ok(stats)
}

/// Run the patterns rooted at `op`'s kind until one rewrites it.
fn try_patterns(func: &mut Function, op: OpId, patterns: &PatternSet, diagnostics: &mut Diagnostics) -> Result<bool> {
    let key = func.get(op)?.op.key();
    for pattern in patterns.for_key(key) {
        let mut rewriter = Rewriter::before(func, op, diagnostics)?;
        match pattern.match_and_rewrite(op, &mut rewriter) {
            RewriteResult::NoMatch => trace!(pattern = pattern.name(), op = %op, "pattern declined"),
            RewriteResult::Rewritten => {
                ensure!(!func.is_live(op), RootNotReplacedSnafu { pattern: pattern.name() });
                debug!(pattern = pattern.name(), op = %op, "op rewritten");
                return Ok(true);
            }
        }
    }
    Ok(false)
}
