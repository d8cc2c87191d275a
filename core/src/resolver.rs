//! Dependency resolver
//!
//! Produces one value for a declared type:
//! - primitives resolve to their zero value
//! - text resolves to the empty string
//! - capabilities are handed to the fake factory with no arguments
//! - concrete types have their constructor's parameters resolved recursively,
//!   then the fake factory (not the plain constructor) creates the value, so
//!   nested objects can be observed and stubbed as well

use crate::catalog::TypeCatalog;
use crate::config::ResolverConfig;
use crate::error::{BoxError, FixtureError};
use crate::fakes::FakeFactory;
use crate::types::{TypeKey, TypeKind, Value};

pub struct DependencyResolver<'c> {
    catalog: &'c TypeCatalog,
    config: ResolverConfig,
}

impl<'c> DependencyResolver<'c> {
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self::with_config(catalog, ResolverConfig::global().clone())
    }

    pub fn with_config(catalog: &'c TypeCatalog, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &'c TypeCatalog {
        self.catalog
    }

    /// Resolve a value for `key`.
    ///
    /// `deep` selects the richest constructor of every nested concrete type
    /// instead of the simplest one. Any failure is reported as a
    /// `ResolutionFailure` naming the type whose subtree failed.
    pub fn resolve(
        &self,
        key: TypeKey,
        factory: &FakeFactory,
        deep: bool,
    ) -> Result<Value, FixtureError> {
        tracing::debug!("Resolving {} (deep = {})", key, deep);
        let mut path = Vec::new();
        self.resolve_in(key, factory, deep, &mut path)
    }

    fn resolve_in(
        &self,
        key: TypeKey,
        factory: &FakeFactory,
        deep: bool,
        path: &mut Vec<TypeKey>,
    ) -> Result<Value, FixtureError> {
        self.produce(key, factory, deep, path)
            .and_then(|value| check_type(key, value))
            .map_err(|source| FixtureError::ResolutionFailure {
                type_name: key.name(),
                source,
            })
    }

    fn produce(
        &self,
        key: TypeKey,
        factory: &FakeFactory,
        deep: bool,
        path: &mut Vec<TypeKey>,
    ) -> Result<Value, BoxError> {
        let descriptor = self.catalog.describe(key)?;

        match self.catalog.classify(key)? {
            TypeKind::Primitive | TypeKind::Text => {
                descriptor.zero_value().ok_or_else(|| {
                    FixtureError::UnknownType {
                        type_name: key.name(),
                    }
                    .into()
                })
            }
            TypeKind::Capability => factory(descriptor, Vec::new()),
            TypeKind::Concrete => {
                if self.config.detect_cycles && path.contains(&key) {
                    return Err(FixtureError::CyclicDependency {
                        path: describe_cycle(path, key),
                    }
                    .into());
                }
                if path.len() >= self.config.max_depth {
                    return Err(FixtureError::DepthExceeded {
                        type_name: key.name(),
                        max_depth: self.config.max_depth,
                    }
                    .into());
                }

                let constructor = self.catalog.select_constructor(key, deep)?;
                path.push(key);
                let args = constructor
                    .params()
                    .iter()
                    .map(|param| {
                        tracing::trace!("Resolving parameter {} of {}", param, key);
                        self.resolve_in(*param, factory, deep, path)
                    })
                    .collect::<Result<Vec<_>, _>>();
                path.pop();

                factory(descriptor, args?)
            }
        }
    }
}

fn check_type(key: TypeKey, value: Value) -> Result<Value, BoxError> {
    if value.key() == key {
        Ok(value)
    } else {
        Err(FixtureError::TypeMismatch {
            expected: key.name(),
            actual: value.key().name(),
        }
        .into())
    }
}

fn describe_cycle(path: &[TypeKey], repeated: TypeKey) -> String {
    let start = path.iter().position(|k| *k == repeated).unwrap_or(0);
    path[start..]
        .iter()
        .chain(std::iter::once(&repeated))
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}
