use super::*;

/// Host Rust types with a fixed IR element type.
///
/// `usize` maps to [`DType::Index`], the type of loop induction variables and
/// buffer subscripts.
pub trait HasDType {
    const DTYPE: DType;
}

/// Element type of `T`, usable in const contexts.
pub const fn dtype_of<T: HasDType>() -> DType {
    T::DTYPE
}

macro_rules! host_dtypes {
    ($($dtype:ident: $($ty:ty),+;)*) => {
        $($(impl HasDType for $ty { const DTYPE: DType = DType::$dtype; })+)*
    };
}

host_dtypes! {
    Bool: bool;
    Int8: i8; Int16: i16; Int32: i32; Int64: i64;
    UInt8: u8; UInt16: u16; UInt32: u32; UInt64: u64;
    Float32: f32; Float64: f64;
    Index: usize;
}
