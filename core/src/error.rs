//! Unified error types for fakeforge
//!
//! Every failure surfaces as a [`FixtureError`]. Failures are layered:
//! - Leaf errors describe a single problem (unknown type, mismatched value, ...)
//! - `ResolutionFailure` wraps everything that goes wrong inside one dependency subtree
//! - `BuildFailure` wraps everything between constructor selection and instantiation
//!
//! Causes are chained through [`std::error::Error::source`], so the root cause is never lost.

use std::error::Error as StdError;

use thiserror::Error;

use crate::fakes::FakeKind;

/// Boxed cause carried by the wrapping variants.
///
/// Constructors, fakers and fake factories supplied by callers return this type,
/// so any error (including `anyhow::Error`) can flow through the engine.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Dependency already registered: {type_name}")]
    DuplicateDependency { type_name: &'static str },

    #[error("Builder for {type_name} has already been used")]
    SingleUseViolation { type_name: &'static str },

    #[error("Failed to resolve dependency of type {type_name}")]
    ResolutionFailure {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Failed to build instance of type {type_name}")]
    BuildFailure {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Type is not registered in the catalog: {type_name}")]
    UnknownType { type_name: &'static str },

    #[error("No accessible constructor for {type_name}")]
    NoAccessibleConstructor { type_name: &'static str },

    #[error("No {kind} backend available for {type_name}")]
    NoFakeBackend {
        type_name: &'static str,
        kind: FakeKind,
    },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Missing argument at position {position}: expected {expected}")]
    MissingArgument {
        position: usize,
        expected: &'static str,
    },

    #[error("Parameter type {type_name} is declared more than once but cannot be cloned")]
    NotCloneable { type_name: &'static str },

    #[error("Cyclic dependency: {path}")]
    CyclicDependency { path: String },

    #[error("Dependency graph deeper than {max_depth} levels at {type_name}")]
    DepthExceeded {
        type_name: &'static str,
        max_depth: usize,
    },

    #[error("Fake does not support transaction stubbing")]
    TransactionStubUnsupported,

    #[error("Transaction stub setter failed")]
    TransactionStubFailed {
        #[source]
        source: BoxError,
    },
}

impl FixtureError {
    /// Walk the cause chain and return the innermost error.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// The innermost error in the chain that is itself a `FixtureError`, if any.
    pub fn innermost_fixture_error(&self) -> &FixtureError {
        let mut found = self;
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            if let Some(fixture) = err.downcast_ref::<FixtureError>() {
                found = fixture;
            }
            current = err.source();
        }
        found
    }
}
