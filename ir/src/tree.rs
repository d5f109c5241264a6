//! Tree visualization for functions.
//!
//! Renders the region nesting as an ASCII tree: each op is a node whose children
//! are the blocks of its regions, and each block lists its ops.

use std::borrow::Cow;
use std::io;

use itertools::Itertools;
use ptree::{Style, TreeItem};

use crate::function::{BlockId, Function, OpId};
use crate::op::Op;

#[derive(Clone)]
enum IrNode<'a> {
    Func(&'a Function),
    Block(&'a Function, BlockId),
    Op(&'a Function, OpId),
}

impl TreeItem for IrNode<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        match self {
            Self::Func(func) => {
                let args = func.arguments().iter().map(|a| format!("{a}: {}", func.value_type(*a))).join(", ");
                write!(f, "func @{}({args})", func.name())
            }
            Self::Block(func, block) => {
                let args = func.block(*block).args.iter().map(|a| format!("{a}: {}", func.value_type(*a))).join(", ");
                write!(f, "{block}({args})")
            }
            Self::Op(func, op) => write!(f, "{}", format_op(func, *op)),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        let children = match *self {
            Self::Func(func) => block_ops(func, func.entry_block()),
            Self::Block(func, block) => block_ops(func, block),
            Self::Op(func, op) => func
                .regions_of(op)
                .iter()
                .flat_map(|r| func.region(*r).blocks.iter().map(move |b| Self::Block(func, *b)))
                .collect(),
        };
        Cow::Owned(children)
    }
}

fn block_ops(func: &Function, block: BlockId) -> Vec<IrNode<'_>> {
    func.block(block).ops.iter().filter(|o| func.is_live(**o)).map(|o| IrNode::Op(func, *o)).collect()
}

/// Format a single op: `%r = name(%a, %b) {attrs} : types`.
fn format_op(func: &Function, id: OpId) -> String {
    let Some(operation) = func.op(id) else { return format!("{id} <erased>") };

    let results = operation.results.iter().join(", ");
    let operands = operation.operands.iter().join(", ");
    let attrs = match &operation.op {
        Op::Const(value) => format!(" {{value = {value}}}"),
        Op::Binary(op) | Op::BufferBinary(op) => format!(" {{op = {op}}}"),
        Op::Cmp(predicate) => format!(" {{predicate = {predicate}}}"),
        Op::Dim { axis } => format!(" {{axis = {axis}}}"),
        Op::Parallel { num_loops } => format!(" {{num_loops = {num_loops}}}"),
        Op::BufferReduce(attrs) => format!(" {{dimensions = {:?}}}", attrs.dimensions.as_slice()),
        Op::BufferReduceWindow(attrs) => {
            let mut parts = vec![format!("window_dimensions = {:?}", attrs.window_dimensions.as_slice())];
            if let Some(strides) = &attrs.window_strides {
                parts.push(format!("window_strides = {:?}", strides.as_slice()));
            }
            if let Some(padding) = &attrs.padding {
                parts.push(format!("padding = {:?}", padding.as_slice()));
            }
            if let Some(dilations) = &attrs.base_dilations {
                parts.push(format!("base_dilations = {:?}", dilations.as_slice()));
            }
            if let Some(dilations) = &attrs.window_dilations {
                parts.push(format!("window_dilations = {:?}", dilations.as_slice()));
            }
            format!(" {{{}}}", parts.join(", "))
        }
        _ => String::new(),
    };
    let types = operation.results.iter().map(|r| func.value_type(*r)).join(", ");

    let mut out = String::new();
    if !results.is_empty() {
        out.push_str(&format!("{results} = "));
    }
    out.push_str(&format!("{}({operands}){attrs}", operation.op.name()));
    if !types.is_empty() {
        out.push_str(&format!(" : {types}"));
    }
    out
}

impl Function {
    /// Render the function as an ASCII tree.
    pub fn tree(&self) -> String {
        let mut buf = Vec::new();
        if let Err(err) = ptree::write_tree(&IrNode::Func(self), &mut buf) {
            return format!("<tree rendering failed: {err}>");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
