//! Test support shared across the workspace.
//!
//! [`fixtures`] builds the functions the lowering tests start from and
//! [`property::generators`] provides proptest strategies for them. Both are
//! available to dependent crates through the `proptest` feature.


#[cfg(test)]
mod unit;
