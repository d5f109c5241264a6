//! Reference interpreter.
//!
//! Executes a [`Function`] over host buffers. Function arguments are buffers that
//! the function reads and writes in place; [`Interpreter::run`] returns them after
//! the function returns.
//!
//! Parallel loops run sequentially in row-major order, one valid schedule of the
//! loop. Buffer-level reductions are executed directly and serve as the reference
//! semantics for their lowered forms.

use std::collections::HashMap;

use kiln_dtype::DType;
use kiln_dtype::ext::HasDType;
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::error::*;
use crate::eval::{eval_binary_op, eval_cmp};
use crate::function::{BlockId, Function, OpId, ValueId};
use crate::op::{Op, ReduceAttrs, ReduceWindowAttrs};
use crate::shape::{Dim, MemRefType, Type, num_elements};
use crate::types::ConstValue;

type Coords = SmallVec<[i64; 4]>;

// ============================================================================
// Host buffers
// ============================================================================

/// Dense row-major buffer of scalar values.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer {
    shape: SmallVec<[usize; 4]>,
    dtype: DType,
    data: Vec<ConstValue>,
}

impl HostBuffer {
    /// Buffer from raw values; each value is normalized to `dtype`.
    pub fn new(shape: &[usize], dtype: DType, data: Vec<ConstValue>) -> Result<Self> {
        let expected = num_elements(shape);
        ensure!(data.len() == expected, BufferSizeMismatchSnafu { shape: shape.to_vec(), expected, actual: data.len() });
        let data = data.into_iter().map(|v| v.cast(dtype)).collect();
        Ok(Self { shape: shape.into(), dtype, data })
    }

    pub fn from_values<T: HasDType + Into<ConstValue> + Copy>(shape: &[usize], values: &[T]) -> Result<Self> {
        Self::new(shape, T::DTYPE, values.iter().map(|v| (*v).into()).collect())
    }

    pub fn filled(shape: &[usize], dtype: DType, value: impl Into<ConstValue>) -> Self {
        let value = value.into().cast(dtype);
        Self { shape: shape.into(), dtype, data: vec![value; num_elements(shape)] }
    }

    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self::filled(shape, dtype, ConstValue::zero(dtype))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[ConstValue] {
        &self.data
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Static memref type describing this buffer.
    pub fn memref_type(&self) -> MemRefType {
        MemRefType::new(self.shape.iter().copied().map(Dim::Static), self.dtype)
    }

    /// Elements as `f64` (booleans as 0/1).
    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.as_f64().unwrap_or(if v.as_bool() == Some(true) { 1.0 } else { 0.0 })).collect()
    }

    fn offset(&self, indices: &[i64]) -> Result<usize> {
        let out_of_bounds = || IndexOutOfBoundsSnafu { indices: indices.to_vec(), shape: self.shape.to_vec() };
        ensure!(indices.len() == self.shape.len(), out_of_bounds());
        let mut offset = 0usize;
        for (index, extent) in indices.iter().zip(&self.shape) {
            let index = usize::try_from(*index).ok().filter(|i| i < extent).context(out_of_bounds())?;
            offset = offset * extent + index;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[i64]) -> Result<ConstValue> {
        Ok(self.data[self.offset(indices)?])
    }

    pub fn set(&mut self, indices: &[i64], value: ConstValue) -> Result<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value.cast(self.dtype);
        Ok(())
    }
}

// ============================================================================
// Index spaces
// ============================================================================

/// Row-major iteration over the points of `[lbs, ubs)` with `steps`.
///
/// A rank-0 space has exactly one (empty) point; a space with an empty axis has none.
#[derive(Debug, Clone)]
pub struct IndexSpace {
    lbs: Coords,
    ubs: Coords,
    steps: Coords,
    next: Option<Coords>,
}

impl IndexSpace {
    pub fn new(lbs: &[i64], ubs: &[i64], steps: &[i64]) -> Self {
        let empty = lbs.iter().zip(ubs).any(|(lb, ub)| lb >= ub);
        Self { lbs: lbs.into(), ubs: ubs.into(), steps: steps.into(), next: (!empty).then(|| lbs.into()) }
    }

    /// Every point of a shape.
    pub fn of_shape(shape: &[usize]) -> Self {
        let ubs: Coords = shape.iter().map(|e| *e as i64).collect();
        Self::new(&vec![0; shape.len()], &ubs, &vec![1; shape.len()])
    }
}

impl Iterator for IndexSpace {
    type Item = Coords;

    fn next(&mut self) -> Option<Coords> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        let mut axis = successor.len();
        while axis > 0 {
            axis -= 1;
            successor[axis] += self.steps[axis];
            if successor[axis] < self.ubs[axis] {
                self.next = Some(successor);
                break;
            }
            successor[axis] = self.lbs[axis];
        }
        Some(current)
    }
}

// ============================================================================
// Interpreter
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Slot {
    Scalar(ConstValue),
    Buffer(usize),
}

/// How a block finished.
#[derive(Debug)]
enum Flow {
    FallThrough,
    Yield(SmallVec<[ConstValue; 2]>),
    ReduceReturn(ConstValue),
    Terminate,
}

/// Accumulators of the innermost running parallel loop.
#[derive(Debug)]
struct AccumulatorFrame {
    values: SmallVec<[ConstValue; 2]>,
    cursor: usize,
}

pub struct Interpreter<'f> {
    func: &'f Function,
    buffers: Vec<HostBuffer>,
    env: HashMap<ValueId, Slot>,
    frames: Vec<AccumulatorFrame>,
}

impl<'f> Interpreter<'f> {
    pub fn new(func: &'f Function) -> Self {
        Self { func, buffers: Vec::new(), env: HashMap::new(), frames: Vec::new() }
    }

    /// Execute `func` on `args` and return the (possibly updated) argument buffers.
    #[tracing::instrument(skip_all, fields(func = func.name(), num_args = args.len()))]
    pub fn run(func: &Function, args: Vec<HostBuffer>) -> Result<Vec<HostBuffer>> {
        Interpreter::new(func).call(args)
    }

    pub fn call(mut self, args: Vec<HostBuffer>) -> Result<Vec<HostBuffer>> {
        let func = self.func;
        let params = func.arguments();
        ensure!(params.len() == args.len(), ArgumentCountSnafu { expected: params.len(), actual: args.len() });

        for (index, (param, buffer)) in params.iter().zip(args).enumerate() {
            let ty = func.value_type(*param);
            ensure!(
                accepts(ty, &buffer),
                ArgumentMismatchSnafu {
                    index,
                    expected: ty.to_string(),
                    actual: buffer.shape().to_vec(),
                    actual_dtype: buffer.dtype()
                }
            );
            let slot = self.push_buffer(buffer);
            self.env.insert(*param, slot);
        }

        self.exec_block(func.entry_block())?;
        self.buffers.truncate(params.len());
        Ok(self.buffers)
    }

    fn push_buffer(&mut self, buffer: HostBuffer) -> Slot {
        self.buffers.push(buffer);
        Slot::Buffer(self.buffers.len() - 1)
    }

    fn scalar(&self, value: ValueId) -> Result<ConstValue> {
        match self.env.get(&value).context(UnboundValueSnafu { value })? {
            Slot::Scalar(v) => Ok(*v),
            Slot::Buffer(_) => ValueKindSnafu { value, expected: "scalar" }.fail(),
        }
    }

    fn buffer_slot(&self, value: ValueId) -> Result<usize> {
        match self.env.get(&value).context(UnboundValueSnafu { value })? {
            Slot::Buffer(slot) => Ok(*slot),
            Slot::Scalar(_) => ValueKindSnafu { value, expected: "buffer" }.fail(),
        }
    }

    fn indices(&self, values: &[ValueId]) -> Result<Coords> {
        values
            .iter()
            .map(|v| {
                let scalar = self.scalar(*v)?;
                scalar.as_index().context(InvalidOperandsSnafu { op_name: "index", dtype: DType::Index })
            })
            .collect()
    }

    /// First element of the buffer in `slot`, which must not be empty.
    fn cell_value(&self, slot: usize, op_name: &'static str, what: &str) -> Result<ConstValue> {
        self.buffers[slot].data.first().copied().context(UnsupportedSnafu { op_name, reason: format!("{what} is empty") })
    }

    fn bind(&mut self, value: ValueId, scalar: ConstValue) {
        self.env.insert(value, Slot::Scalar(scalar));
    }

    fn exec_block(&mut self, block: BlockId) -> Result<Flow> {
        let func = self.func;
        for op in &func.block(block).ops {
            match self.exec_op(*op)? {
                Flow::FallThrough => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::FallThrough)
    }

    fn exec_op(&mut self, id: OpId) -> Result<Flow> {
        let func = self.func;
        let operation = func.get(id)?;
        let operands = operation.operands.as_slice();
        let op_name = operation.op.name();
        trace!(op = %id, op_name, "exec");
        let operand = |index: usize| nth(operands, index, op_name, "operand");
        let result = || nth(&operation.results, 0, op_name, "result");

        match &operation.op {
            Op::Const(value) => self.bind(result()?, *value),
            Op::Binary(binary) => {
                let dtype = func.value_type(result()?).element();
                let (a, b) = (self.scalar(operand(0)?)?, self.scalar(operand(1)?)?);
                let value = eval_binary_op(*binary, a, b).context(InvalidOperandsSnafu { op_name, dtype })?;
                self.bind(result()?, value.cast(dtype));
            }
            Op::Cmp(predicate) => {
                let dtype = func.value_type(operand(0)?).element();
                let (a, b) = (self.scalar(operand(0)?)?, self.scalar(operand(1)?)?);
                let value = eval_cmp(*predicate, a, b, dtype).context(InvalidOperandsSnafu { op_name, dtype })?;
                self.bind(result()?, ConstValue::Bool(value));
            }
            Op::Select => {
                let cond = self.scalar(operand(0)?)?;
                let cond = cond.as_bool().context(InvalidOperandsSnafu { op_name, dtype: DType::Bool })?;
                let chosen = if cond { operand(1)? } else { operand(2)? };
                let value = self.scalar(chosen)?;
                self.bind(result()?, value);
            }
            Op::Dim { axis } => {
                let buffer = &self.buffers[self.buffer_slot(operand(0)?)?];
                let extent = *buffer.shape().get(*axis).context(IndexOutOfBoundsSnafu {
                    indices: vec![*axis as i64],
                    shape: buffer.shape().to_vec(),
                })?;
                self.bind(result()?, ConstValue::Int(extent as i64));
            }
            Op::Alloc => {
                let ty = func.value_type(result()?);
                let memref = ty.as_memref().context(ValueKindSnafu { value: result()?, expected: "buffer" })?;
                let shape = crate::shape::to_static(&memref.shape).context(DynamicAllocSnafu { ty: ty.to_string() })?;
                let slot = self.push_buffer(HostBuffer::zeros(&shape, memref.elem));
                self.env.insert(result()?, slot);
            }
            Op::Load => {
                let slot = self.buffer_slot(operand(0)?)?;
                let indices = self.indices(&operands[1..])?;
                let value = self.buffers[slot].get(&indices)?;
                self.bind(result()?, value);
            }
            Op::Store => {
                let value = self.scalar(operand(0)?)?;
                let slot = self.buffer_slot(operand(1)?)?;
                let indices = self.indices(&operands[2..])?;
                self.buffers[slot].set(&indices, value)?;
            }
            Op::Parallel { num_loops } => self.exec_parallel(id, *num_loops)?,
            Op::Reduce => self.exec_reduce(id)?,
            Op::ReduceReturn => return Ok(Flow::ReduceReturn(self.scalar(operand(0)?)?)),
            Op::If => {
                let cond = self.scalar(operand(0)?)?;
                let cond = cond.as_bool().context(InvalidOperandsSnafu { op_name, dtype: DType::Bool })?;
                let block = func.region_block(id, if cond { 0 } else { 1 })?;
                if let Flow::Yield(values) = self.exec_block(block)? {
                    for (result, value) in operation.results.iter().zip(values) {
                        self.bind(*result, value);
                    }
                }
            }
            Op::Yield => {
                let values = operands.iter().map(|v| self.scalar(*v)).collect::<Result<_>>()?;
                return Ok(Flow::Yield(values));
            }
            Op::BufferReduce(attrs) => self.exec_buffer_reduce(id, attrs)?,
            Op::BufferReduceWindow(attrs) => self.exec_buffer_reduce_window(id, attrs)?,
            Op::BufferBinary(binary) => {
                let (lhs, rhs, out) =
                    (self.buffer_slot(operand(0)?)?, self.buffer_slot(operand(1)?)?, self.buffer_slot(operand(2)?)?);
                let dtype = self.buffers[out].dtype();
                let values = self.buffers[lhs]
                    .data()
                    .iter()
                    .zip(self.buffers[rhs].data())
                    .map(|(a, b)| eval_binary_op(*binary, *a, *b).context(InvalidOperandsSnafu { op_name, dtype }))
                    .collect::<Result<Vec<_>>>()?;
                ensure!(
                    values.len() == self.buffers[out].data.len(),
                    UnsupportedSnafu { op_name, reason: "operand and output shapes differ" }
                );
                self.buffers[out].data = values.into_iter().map(|v| v.cast(dtype)).collect();
            }
            Op::BufferTerminator | Op::Return => return Ok(Flow::Terminate),
        }
        Ok(Flow::FallThrough)
    }

    fn exec_parallel(&mut self, id: OpId, num_loops: usize) -> Result<()> {
        let func = self.func;
        let operation = func.get(id)?;
        let operands = operation.operands.as_slice();
        ensure!(
            operands.len() >= 3 * num_loops,
            UnsupportedSnafu { op_name: "loop.parallel", reason: format!("expected {} bound operand(s)", 3 * num_loops) }
        );
        let (bounds, inits) = operands.split_at(3 * num_loops);
        let lbs = self.indices(&bounds[..num_loops])?;
        let ubs = self.indices(&bounds[num_loops..2 * num_loops])?;
        let steps = self.indices(&bounds[2 * num_loops..])?;
        ensure!(
            steps.iter().all(|s| *s > 0),
            UnsupportedSnafu { op_name: "loop.parallel", reason: format!("non-positive step in {steps:?}") }
        );

        let values = inits.iter().map(|v| self.scalar(*v)).collect::<Result<_>>()?;
        self.frames.push(AccumulatorFrame { values, cursor: 0 });

        let body = func.region_block(id, 0)?;
        let ivs = &func.block(body).args;
        for point in IndexSpace::new(&lbs, &ubs, &steps) {
            for (iv, value) in ivs.iter().zip(&point) {
                self.bind(*iv, ConstValue::Int(*value));
            }
            if let Some(frame) = self.frames.last_mut() {
                frame.cursor = 0;
            }
            self.exec_block(body)?;
        }

        let frame = self.frames.pop().context(ReduceOutsideParallelSnafu { op: id })?;
        for (result, value) in operation.results.iter().zip(frame.values) {
            self.bind(*result, value);
        }
        Ok(())
    }

    fn exec_reduce(&mut self, id: OpId) -> Result<()> {
        let func = self.func;
        let operation = func.get(id)?;
        let element = self.scalar(nth(&operation.operands, 0, "loop.reduce", "operand")?)?;
        let (index, acc) = {
            let frame = self.frames.last_mut().context(ReduceOutsideParallelSnafu { op: id })?;
            let index = frame.cursor;
            frame.cursor += 1;
            let acc = frame.values.get(index).copied().context(UnsupportedSnafu {
                op_name: "loop.reduce",
                reason: format!("reduce #{index} has no matching loop result"),
            })?;
            (index, acc)
        };

        let body = func.region_block(id, 0)?;
        let args = &func.block(body).args;
        self.bind(nth(args, 0, "loop.reduce", "body argument")?, element);
        self.bind(nth(args, 1, "loop.reduce", "body argument")?, acc);
        let Flow::ReduceReturn(value) = self.exec_block(body)? else {
            return UnsupportedSnafu { op_name: "loop.reduce", reason: "body did not return a value" }.fail();
        };

        let frame = self.frames.last_mut().context(ReduceOutsideParallelSnafu { op: id })?;
        frame.values[index] = value;
        Ok(())
    }

    /// Run a buffer-reduction body on `(element, accumulator)` and return the result cell.
    fn apply_body(
        &mut self,
        op_name: &'static str,
        body: BlockId,
        element: ConstValue,
        acc: ConstValue,
        dtype: DType,
    ) -> Result<ConstValue> {
        let func = self.func;
        let args = &func.block(body).args;
        ensure!(
            args.len() == 3,
            UnsupportedSnafu { op_name, reason: format!("reduction body takes {} argument(s), expected 3", args.len()) }
        );
        let mark = self.buffers.len();
        for (arg, value) in args.iter().zip([element, acc, ConstValue::zero(dtype)]) {
            let slot = self.push_buffer(HostBuffer::filled(&[], dtype, value));
            self.env.insert(*arg, slot);
        }
        self.exec_block(body)?;
        let result = self.cell_value(mark + 2, op_name, "result cell");
        self.buffers.truncate(mark);
        result
    }

    fn exec_buffer_reduce(&mut self, id: OpId, attrs: &ReduceAttrs) -> Result<()> {
        let op_name = "buffer.reduce";
        ensure!(attrs.num_inputs == 1, UnsupportedSnafu { op_name, reason: "variadic reduce" });
        let operands = self.func.get(id)?.operands.clone();
        let body = self.func.region_block(id, 0)?;
        let input = self.buffers[self.buffer_slot(nth(&operands, 0, op_name, "operand")?)?].clone();
        let init = self.cell_value(self.buffer_slot(nth(&operands, 1, op_name, "operand")?)?, op_name, "init buffer")?;
        let out = self.buffer_slot(nth(&operands, 2, op_name, "operand")?)?;

        let rank = input.rank();
        ensure!(
            attrs.dimensions.iter().all(|d| *d < rank),
            UnsupportedSnafu { op_name, reason: format!("dimensions {:?} out of range", attrs.dimensions) }
        );
        let reduced: SmallVec<[bool; 4]> = (0..rank).map(|axis| attrs.dimensions.contains(&axis)).collect();
        let kept_shape: SmallVec<[usize; 4]> = (0..rank).filter(|a| !reduced[*a]).map(|a| input.shape()[a]).collect();
        let reduced_shape: SmallVec<[usize; 4]> = (0..rank).filter(|a| reduced[*a]).map(|a| input.shape()[a]).collect();
        let out_rank = self.buffers[out].rank();

        for kept in IndexSpace::of_shape(&kept_shape) {
            let mut acc = init;
            for red in IndexSpace::of_shape(&reduced_shape) {
                let (mut k, mut r) = (kept.iter(), red.iter());
                let coords: Coords =
                    reduced.iter().filter_map(|is_reduced| if *is_reduced { r.next() } else { k.next() }).copied().collect();
                let element = input.get(&coords)?;
                acc = self.apply_body(op_name, body, element, acc, input.dtype())?;
            }
            let out_coords: Coords = if out_rank == kept.len() { kept } else { smallvec::smallvec![0; out_rank] };
            self.buffers[out].set(&out_coords, acc)?;
        }
        Ok(())
    }

    fn exec_buffer_reduce_window(&mut self, id: OpId, attrs: &ReduceWindowAttrs) -> Result<()> {
        let op_name = "buffer.reduce_window";
        let operands = self.func.get(id)?.operands.clone();
        let body = self.func.region_block(id, 0)?;
        let input = self.buffers[self.buffer_slot(nth(&operands, 0, op_name, "operand")?)?].clone();
        let init = self.cell_value(self.buffer_slot(nth(&operands, 1, op_name, "operand")?)?, op_name, "init buffer")?;
        let out = self.buffer_slot(nth(&operands, 2, op_name, "operand")?)?;
        let out_shape = self.buffers[out].shape().to_vec();

        let rank = input.rank();
        ensure!(
            attrs.window_dimensions.len() == rank && out_shape.len() == rank,
            UnsupportedSnafu { op_name, reason: "window, operand and output ranks differ" }
        );
        let strides: Coords = match &attrs.window_strides {
            Some(strides) => strides.iter().map(|s| *s as i64).collect(),
            None => smallvec::smallvec![1; rank],
        };
        let pad_low: Coords = match &attrs.padding {
            Some(padding) => padding.iter().map(|(low, _)| *low).collect(),
            None => smallvec::smallvec![0; rank],
        };

        for outer in IndexSpace::of_shape(&out_shape) {
            let mut acc = init;
            for inner in IndexSpace::of_shape(&attrs.window_dimensions) {
                let coords: Coords = (0..rank).map(|i| outer[i] * strides[i] + inner[i] - pad_low[i]).collect();
                let in_bounds = coords.iter().zip(input.shape()).all(|(c, e)| (0..*e as i64).contains(c));
                let element = if in_bounds { input.get(&coords)? } else { init };
                acc = self.apply_body(op_name, body, element, acc, input.dtype())?;
            }
            self.buffers[out].set(&outer, acc)?;
        }
        Ok(())
    }
}

/// `values[index]`, or an error naming the missing `what`.
fn nth(values: &[ValueId], index: usize, op_name: &'static str, what: &str) -> Result<ValueId> {
    values.get(index).copied().context(UnsupportedSnafu { op_name, reason: format!("missing {what} #{index}") })
}

/// True when `buffer` can be bound to a parameter of type `ty`.
fn accepts(ty: &Type, buffer: &HostBuffer) -> bool {
    let Some(memref) = ty.as_memref() else { return false };
    memref.elem == buffer.dtype()
        && memref.rank() == buffer.rank()
        && memref.shape.iter().zip(buffer.shape()).all(|(dim, extent)| dim.as_static().is_none_or(|d| d == *extent))
}
