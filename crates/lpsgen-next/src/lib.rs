//! Next-state generation for linear process specifications.
//!
//! [`NextState`] turns a [`lpsgen_ir::Specification`] into an engine that
//! packs states into the shared term pool and enumerates their outgoing
//! transitions lazily through [`NextStateGenerator`]s.

pub mod arena;
pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod nextstate;
pub mod table;

pub use codec::{State, StateCodec};
pub use config::{ConfigError, NextStateConfig, StateFormat, SubstitutionMode};
pub use error::{
    GenerateError, GenerateResult, SpecResult, SpecificationError, StateError, StateResult,
    Warning,
};
pub use generator::{ActionInstance, NextStateGenerator, Transition};
pub use nextstate::NextState;
pub use table::{SummandEntry, SummandTable};
