//! Buffer shapes and value types.
//!
//! A shape is a sequence of extents, each either known at compile time or
//! [`Dim::Dynamic`] (resolved from the buffer at run time).

use std::fmt;

use kiln_dtype::DType;
use smallvec::SmallVec;

/// A single extent of a buffer shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Compile-time constant extent.
    Static(usize),
    /// Extent only known at run time; query it with a `Dim` op.
    Dynamic,
}

impl Dim {
    pub const fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    pub const fn as_static(&self) -> Option<usize> {
        match self {
            Self::Static(n) => Some(*n),
            Self::Dynamic => None,
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Self::Static(n)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(n) => write!(f, "{n}"),
            Self::Dynamic => f.write_str("?"),
        }
    }
}

/// Shape type - sequence of extents.
///
/// Inline capacity of 4 covers the ranks this IR sees in practice.
pub type Shape = SmallVec<[Dim; 4]>;

/// Build a fully static shape.
pub fn static_shape(dims: &[usize]) -> Shape {
    dims.iter().copied().map(Dim::Static).collect()
}

/// Convert shape to concrete extents if fully static, None otherwise.
pub fn to_static(shape: &Shape) -> Option<SmallVec<[usize; 4]>> {
    shape.iter().map(Dim::as_static).collect()
}

/// Number of elements of a concrete shape (1 for rank 0).
pub fn num_elements(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Shaped buffer type (`memref<4x?xf32>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemRefType {
    pub shape: Shape,
    pub elem: DType,
}

impl MemRefType {
    pub fn new(shape: impl IntoIterator<Item = Dim>, elem: DType) -> Self {
        Self { shape: shape.into_iter().collect(), elem }
    }

    /// Rank-0 buffer holding a single scalar.
    pub fn scalar(elem: DType) -> Self {
        Self { shape: Shape::new(), elem }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

impl fmt::Display for MemRefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memref<")?;
        for dim in &self.shape {
            write!(f, "{dim}x")?;
        }
        write!(f, "{}>", self.elem)
    }
}

/// Type of an SSA value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Scalar(DType),
    MemRef(MemRefType),
}

impl Type {
    pub const fn index() -> Self {
        Self::Scalar(DType::Index)
    }

    pub const fn bool_() -> Self {
        Self::Scalar(DType::Bool)
    }

    pub fn as_memref(&self) -> Option<&MemRefType> {
        match self {
            Self::MemRef(m) => Some(m),
            Self::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<DType> {
        match self {
            Self::Scalar(d) => Some(*d),
            Self::MemRef(_) => None,
        }
    }

    /// Element type of a memref, or the scalar type itself.
    pub fn element(&self) -> DType {
        match self {
            Self::Scalar(d) => *d,
            Self::MemRef(m) => m.elem,
        }
    }
}

impl From<DType> for Type {
    fn from(d: DType) -> Self {
        Self::Scalar(d)
    }
}

impl From<MemRefType> for Type {
    fn from(m: MemRefType) -> Self {
        Self::MemRef(m)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(d) => write!(f, "{d}"),
            Self::MemRef(m) => write!(f, "{m}"),
        }
    }
}
