//! Scalar value and operator definitions shared by the IR, builder and interpreter.

use kiln_dtype::DType;

/// Constant scalar value.
///
/// `Index` values are carried as `Int`: the index type is 64 bits wide and its
/// signedness is decided by the comparison predicate, not by the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

/// Helper macro to cast to target width and back to storage type (for proper truncation/extension).
macro_rules! cast_via {
    ($v:expr, $target:ty, $storage:ty) => {
        ($v as $target) as $storage
    };
}

#[inline]
fn cast_int(v: i64, to: DType) -> ConstValue {
    use DType::*;
    match to {
        Bool => ConstValue::Bool(v != 0),
        Int8 => ConstValue::Int(cast_via!(v, i8, i64)),
        Int16 => ConstValue::Int(cast_via!(v, i16, i64)),
        Int32 => ConstValue::Int(cast_via!(v, i32, i64)),
        Int64 | Index => ConstValue::Int(v),
        UInt8 => ConstValue::UInt(cast_via!(v, u8, u64)),
        UInt16 => ConstValue::UInt(cast_via!(v, u16, u64)),
        UInt32 => ConstValue::UInt(cast_via!(v, u32, u64)),
        UInt64 => ConstValue::UInt(v as u64),
        Float32 => ConstValue::Float(v as f32 as f64),
        Float64 => ConstValue::Float(v as f64),
    }
}

#[inline]
fn cast_uint(v: u64, to: DType) -> ConstValue {
    use DType::*;
    match to {
        Bool => ConstValue::Bool(v != 0),
        Int8 => ConstValue::Int(cast_via!(v, i8, i64)),
        Int16 => ConstValue::Int(cast_via!(v, i16, i64)),
        Int32 => ConstValue::Int(cast_via!(v, i32, i64)),
        Int64 | Index => ConstValue::Int(v as i64),
        UInt8 => ConstValue::UInt(cast_via!(v, u8, u64)),
        UInt16 => ConstValue::UInt(cast_via!(v, u16, u64)),
        UInt32 => ConstValue::UInt(cast_via!(v, u32, u64)),
        UInt64 => ConstValue::UInt(v),
        Float32 => ConstValue::Float(v as f32 as f64),
        Float64 => ConstValue::Float(v as f64),
    }
}

#[inline]
fn cast_float(v: f64, to: DType) -> ConstValue {
    use DType::*;
    match to {
        Bool => ConstValue::Bool(v != 0.0),
        Int8 => ConstValue::Int(cast_via!(v, i8, i64)),
        Int16 => ConstValue::Int(cast_via!(v, i16, i64)),
        Int32 => ConstValue::Int(cast_via!(v, i32, i64)),
        Int64 | Index => ConstValue::Int(v as i64),
        // Float-to-unsigned routes through i64 first
        UInt8 => ConstValue::UInt(cast_via!(v as i64, u8, u64)),
        UInt16 => ConstValue::UInt(cast_via!(v as i64, u16, u64)),
        UInt32 => ConstValue::UInt(cast_via!(v as i64, u32, u64)),
        UInt64 => ConstValue::UInt((v as i64) as u64),
        Float32 => ConstValue::Float(v as f32 as f64),
        Float64 => ConstValue::Float(v),
    }
}

impl ConstValue {
    pub const fn zero(dtype: DType) -> Self {
        use DType::*;
        match dtype {
            Bool => Self::Bool(false),
            Int8 | Int16 | Int32 | Int64 | Index => Self::Int(0),
            UInt8 | UInt16 | UInt32 | UInt64 => Self::UInt(0),
            Float32 | Float64 => Self::Float(0.0),
        }
    }

    pub const fn one(dtype: DType) -> Self {
        use DType::*;
        match dtype {
            Bool => Self::Bool(true),
            Int8 | Int16 | Int32 | Int64 | Index => Self::Int(1),
            UInt8 | UInt16 | UInt32 | UInt64 => Self::UInt(1),
            Float32 | Float64 => Self::Float(1.0),
        }
    }

    /// Normalize this value into the representation of `dtype`.
    ///
    /// Follows `as` semantics: narrowing truncates, float-to-int truncates toward zero.
    /// Buffers store every element through this cast, so a value read back always
    /// has the storage width of its buffer.
    pub fn cast(&self, dtype: DType) -> Self {
        match *self {
            Self::Bool(v) => cast_int(v as i64, dtype),
            Self::Int(v) => cast_int(v, dtype),
            Self::UInt(v) => cast_uint(v, dtype),
            Self::Float(v) => cast_float(v, dtype),
        }
    }

    /// Interpret as a signed index.
    pub fn as_index(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::UInt(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            Self::UInt(v) => Some(v as f64),
            Self::Bool(_) => None,
        }
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ConstValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ConstValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<bool> for ConstValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Binary operation types.
///
/// All binary operations preserve the LHS dtype. Integer arithmetic wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Max,
    Min,
    /// Logical/bitwise AND (bool and int only).
    And,
    /// Logical/bitwise OR (bool and int only).
    Or,
}

impl BinaryOp {
    /// `and`/`or`, undefined on floats.
    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Integer comparison predicates. Float operands use the signed (ordered) variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display, strum::VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum CmpPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    /// Unsigned less-than: operands are reinterpreted at their full bit width,
    /// so a negative index compares as a very large value.
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl CmpPredicate {
    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::Ult | Self::Ule | Self::Ugt | Self::Uge)
    }
}
