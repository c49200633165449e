//! Engine configuration.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Physical representation of states. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateFormat {
    /// One N-ary node per state.
    #[default]
    Vector,
    /// Balanced binary tree of pairs; sub-vectors are shared between states.
    Tree,
}

/// How free variables of the specification are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubstitutionMode {
    /// Free variables stay symbolic; conditions must be decided exactly.
    #[default]
    Exact,
    /// Free variables are replaced by a fixed representative of their sort
    /// when the summand table is built.
    Dummy,
}

/// Configuration for [`crate::NextState::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NextStateConfig {
    /// State representation.
    pub format: StateFormat,
    /// Treatment of free variables.
    pub substitution: SubstitutionMode,
}

impl NextStateConfig {
    pub fn new(format: StateFormat, substitution: SubstitutionMode) -> Self {
        Self {
            format,
            substitution,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown state format '{0}' (expected 'vector' or 'tree')")]
    UnknownFormat(String),

    #[error("unknown substitution mode '{0}' (expected 'exact' or 'dummy')")]
    UnknownSubstitution(String),
}

impl FromStr for StateFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vector" => Ok(StateFormat::Vector),
            "tree" => Ok(StateFormat::Tree),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for StateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFormat::Vector => write!(f, "vector"),
            StateFormat::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for SubstitutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(SubstitutionMode::Exact),
            "dummy" => Ok(SubstitutionMode::Dummy),
            _ => Err(ConfigError::UnknownSubstitution(s.to_string())),
        }
    }
}

impl fmt::Display for SubstitutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionMode::Exact => write!(f, "exact"),
            SubstitutionMode::Dummy => write!(f, "dummy"),
        }
    }
}
