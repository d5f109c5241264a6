pub mod builder;
pub mod diagnostic;
pub mod rewrite;
