//! Element types for the Kiln buffer IR.
//!
//! Buffers in Kiln are shaped arrays of a single scalar element type. This crate
//! only describes those scalars; shapes and memref types live in `kiln-ir`.

pub mod ext;


/// Scalar element type.
///
/// `Index` is the loop/addressing type: 64 bits wide, compared either signed or
/// unsigned depending on the predicate (the windowed lowering relies on the
/// unsigned view to fold a two-sided bounds check into one comparison).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::VariantArray, strum::AsRefStr, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    #[strum(serialize = "i1")]
    Bool,

    #[strum(serialize = "i8")]
    Int8,
    #[strum(serialize = "i16")]
    Int16,
    #[strum(serialize = "i32")]
    Int32,
    #[strum(serialize = "i64")]
    Int64,

    #[strum(serialize = "ui8")]
    UInt8,
    #[strum(serialize = "ui16")]
    UInt16,
    #[strum(serialize = "ui32")]
    UInt32,
    #[strum(serialize = "ui64")]
    UInt64,

    #[strum(serialize = "f32")]
    Float32,
    #[strum(serialize = "f64")]
    Float64,

    #[strum(serialize = "index")]
    Index,
}

impl DType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::Index => 8,
        }
    }

    /// Bit width used for wrap-around integer arithmetic.
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bool => 1,
            _ => (self.bytes() * 8) as u32,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    /// Integer types, including `Index`. `Bool` is not an integer here.
    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned() || matches!(self, Self::Index)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index)
    }
}
