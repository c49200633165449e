//! Linear process specifications for lpsgen.

pub mod analyze;
pub mod ir;

pub use analyze::{free_variables, profile, SpecProfile};
pub use ir::*;
