//! One-shot fakes
//!
//! `BuilderFacade` skips the override bookkeeping of [`InstanceBuilder`]
//! entirely: it runs the resolver on the target itself with the named factory
//! from the process-wide registry.
//!
//! [`InstanceBuilder`]: crate::builder::InstanceBuilder

use std::marker::PhantomData;

use crate::catalog::TypeCatalog;
use crate::error::FixtureError;
use crate::fakes::{global_factories, FakeKind};
use crate::resolver::DependencyResolver;
use crate::types::TypeKey;

pub struct BuilderFacade<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T: 'static> BuilderFacade<T> {
    pub fn generate_stub(catalog: &TypeCatalog, deep: bool) -> Result<T, FixtureError> {
        Self::generate(catalog, FakeKind::Stub, deep)
    }

    pub fn generate_mock(catalog: &TypeCatalog, deep: bool) -> Result<T, FixtureError> {
        Self::generate(catalog, FakeKind::Mock, deep)
    }

    pub fn generate_strict_mock(catalog: &TypeCatalog, deep: bool) -> Result<T, FixtureError> {
        Self::generate(catalog, FakeKind::StrictMock, deep)
    }

    fn generate(catalog: &TypeCatalog, kind: FakeKind, deep: bool) -> Result<T, FixtureError> {
        let factory = global_factories().factory(kind);
        let key = TypeKey::of::<T>();
        tracing::debug!("Generating {} of {}", kind, key);

        DependencyResolver::new(catalog)
            .resolve(key, &factory, deep)?
            .cast::<T>()
    }
}
