//! Fake factory registry
//!
//! Four swappable factory functions (stub, mock, strict mock, partial mock)
//! plus the transaction stub setter hook. A `FakeFactories` value can be handed
//! to a builder directly; otherwise builders read the process-wide registry at
//! build time, so global overrides take effect for every later build.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::backend;
use crate::catalog::TypeDescriptor;
use crate::error::{BoxError, FixtureError};
use crate::types::Value;

/// `(type, positional constructor arguments) -> fake instance`
pub type FakeFactory =
    Arc<dyn Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync>;

/// Produces the value a stubbed transaction factory hands out
pub type TransactionSupplier = Box<dyn Fn() -> Value>;

/// `(transaction factory fake, supplier)`: stub the fake's creation method
pub type TransactionStubSetter =
    Arc<dyn Fn(&dyn Any, TransactionSupplier) -> Result<(), BoxError> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FakeKind {
    Stub,
    Mock,
    StrictMock,
    PartialMock,
}

impl FakeKind {
    pub const ALL: [FakeKind; 4] = [
        FakeKind::Stub,
        FakeKind::Mock,
        FakeKind::StrictMock,
        FakeKind::PartialMock,
    ];
}

impl fmt::Display for FakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FakeKind::Stub => write!(f, "stub"),
            FakeKind::Mock => write!(f, "mock"),
            FakeKind::StrictMock => write!(f, "strict mock"),
            FakeKind::PartialMock => write!(f, "partial mock"),
        }
    }
}

#[derive(Clone)]
pub struct FakeFactories {
    stub: FakeFactory,
    mock: FakeFactory,
    strict_mock: FakeFactory,
    partial_mock: FakeFactory,
    transaction_stub_setter: TransactionStubSetter,
}

impl Default for FakeFactories {
    fn default() -> Self {
        Self {
            stub: backend::default_factory(FakeKind::Stub),
            mock: backend::default_factory(FakeKind::Mock),
            strict_mock: backend::default_factory(FakeKind::StrictMock),
            partial_mock: backend::default_factory(FakeKind::PartialMock),
            transaction_stub_setter: backend::default_transaction_stub_setter(),
        }
    }
}

impl fmt::Debug for FakeFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeFactories").finish_non_exhaustive()
    }
}

impl FakeFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_stub_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.stub = Arc::new(factory);
        self
    }

    pub fn register_mock_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.mock = Arc::new(factory);
        self
    }

    pub fn register_strict_mock_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.strict_mock = Arc::new(factory);
        self
    }

    pub fn register_partial_mock_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.partial_mock = Arc::new(factory);
        self
    }

    pub fn register_transaction_stub_setter<F>(&mut self, setter: F) -> &mut Self
    where
        F: Fn(&dyn Any, TransactionSupplier) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.transaction_stub_setter = Arc::new(setter);
        self
    }

    /// Active factory for one kind of fake
    pub fn factory(&self, kind: FakeKind) -> FakeFactory {
        match kind {
            FakeKind::Stub => self.stub.clone(),
            FakeKind::Mock => self.mock.clone(),
            FakeKind::StrictMock => self.strict_mock.clone(),
            FakeKind::PartialMock => self.partial_mock.clone(),
        }
    }

    /// Make `transaction_factory` hand out values from `supplier` when asked
    /// to create a transaction, through the active setter.
    pub fn set_transaction_stub(
        &self,
        transaction_factory: &dyn Any,
        supplier: TransactionSupplier,
    ) -> Result<(), BoxError> {
        (self.transaction_stub_setter)(transaction_factory, supplier)
    }
}

// ============================================================================
// Process-wide registry
// ============================================================================

static GLOBAL_FACTORIES: Lazy<RwLock<FakeFactories>> =
    Lazy::new(|| RwLock::new(FakeFactories::default()));

/// Snapshot of the process-wide factories
pub fn global_factories() -> FakeFactories {
    GLOBAL_FACTORIES.read().clone()
}

/// Replace the process-wide factories wholesale; returns the previous set
pub fn replace_global_factories(factories: FakeFactories) -> FakeFactories {
    std::mem::replace(&mut *GLOBAL_FACTORIES.write(), factories)
}

/// Restore every process-wide factory to the built-in backend
pub fn reset_global_factories() {
    replace_global_factories(FakeFactories::default());
}

pub fn register_stub_factory<F>(factory: F)
where
    F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    GLOBAL_FACTORIES.write().register_stub_factory(factory);
}

pub fn register_mock_factory<F>(factory: F)
where
    F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    GLOBAL_FACTORIES.write().register_mock_factory(factory);
}

pub fn register_strict_mock_factory<F>(factory: F)
where
    F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    GLOBAL_FACTORIES.write().register_strict_mock_factory(factory);
}

pub fn register_partial_mock_factory<F>(factory: F)
where
    F: Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    GLOBAL_FACTORIES.write().register_partial_mock_factory(factory);
}

pub fn register_transaction_stub_setter<F>(setter: F)
where
    F: Fn(&dyn Any, TransactionSupplier) -> Result<(), BoxError> + Send + Sync + 'static,
{
    GLOBAL_FACTORIES.write().register_transaction_stub_setter(setter);
}

/// Stub a transaction factory fake through the process-wide setter
pub fn set_transaction_stub(
    transaction_factory: &dyn Any,
    supplier: TransactionSupplier,
) -> Result<(), FixtureError> {
    let factories = global_factories();
    factories
        .set_transaction_stub(transaction_factory, supplier)
        .map_err(|source| match source.downcast::<FixtureError>() {
            Ok(fixture) => *fixture,
            Err(source) => FixtureError::TransactionStubFailed { source },
        })
}

/// Temporarily adjust the process-wide factories.
///
/// `adjust` runs on a copy with no lock held, so it may call the global
/// registry functions itself. The previous factories come back when the
/// returned guard is dropped. Nested guards must be dropped innermost first;
/// an outer guard dropped early is overwritten by the inner one's restore.
pub fn override_factories<F>(adjust: F) -> FactoryOverrideGuard
where
    F: FnOnce(&mut FakeFactories),
{
    let mut adjusted = global_factories();
    adjust(&mut adjusted);
    let previous = replace_global_factories(adjusted);
    FactoryOverrideGuard {
        previous: Some(previous),
    }
}

#[must_use = "the override is undone as soon as the guard is dropped"]
pub struct FactoryOverrideGuard {
    previous: Option<FakeFactories>,
}

impl Drop for FactoryOverrideGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            tracing::trace!("Restoring process-wide fake factories");
            *GLOBAL_FACTORIES.write() = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeCatalog;
    use crate::types::TypeKey;
    use serial_test::serial;

    fn constant_factory(
        marker: &'static str,
    ) -> impl Fn(&TypeDescriptor, Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static
    {
        move |_: &TypeDescriptor, _: Vec<Value>| Ok(Value::new(marker))
    }

    fn call(factories: &FakeFactories, kind: FakeKind) -> &'static str {
        let catalog = TypeCatalog::new();
        let descriptor = catalog.describe(TypeKey::of::<u8>()).unwrap();
        factories.factory(kind)(descriptor, Vec::new())
            .unwrap()
            .cast::<&'static str>()
            .unwrap()
    }

    #[test]
    fn test_each_slot_is_independent() {
        let mut factories = FakeFactories::new();
        factories
            .register_stub_factory(constant_factory("stub"))
            .register_mock_factory(constant_factory("mock"))
            .register_strict_mock_factory(constant_factory("strict"))
            .register_partial_mock_factory(constant_factory("partial"));

        assert_eq!(call(&factories, FakeKind::Stub), "stub");
        assert_eq!(call(&factories, FakeKind::Mock), "mock");
        assert_eq!(call(&factories, FakeKind::StrictMock), "strict");
        assert_eq!(call(&factories, FakeKind::PartialMock), "partial");
    }

    #[test]
    fn test_registering_twice_overwrites() {
        let mut factories = FakeFactories::new();
        factories.register_stub_factory(constant_factory("first"));
        factories.register_stub_factory(constant_factory("second"));

        assert_eq!(call(&factories, FakeKind::Stub), "second");
    }

    #[test]
    #[serial]
    fn test_global_registration_is_visible_immediately() {
        reset_global_factories();
        register_mock_factory(constant_factory("global-mock"));

        assert_eq!(call(&global_factories(), FakeKind::Mock), "global-mock");

        reset_global_factories();
    }

    #[test]
    #[serial]
    fn test_override_guard_restores_previous_factories() {
        reset_global_factories();
        register_stub_factory(constant_factory("outer"));

        {
            let _guard = override_factories(|factories| {
                factories.register_stub_factory(constant_factory("inner"));
            });
            assert_eq!(call(&global_factories(), FakeKind::Stub), "inner");
        }

        assert_eq!(call(&global_factories(), FakeKind::Stub), "outer");
        reset_global_factories();
    }

    #[test]
    #[serial]
    fn test_custom_transaction_stub_setter() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let _guard = override_factories(|factories| {
            factories.register_transaction_stub_setter(|_, supplier| {
                assert_eq!(supplier().cast::<u32>()?, 42);
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        });

        set_transaction_stub(&(), Box::new(|| Value::new(42u32))).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[serial]
    fn test_default_transaction_stub_setter_rejects_unknown_fakes() {
        reset_global_factories();

        let err = set_transaction_stub(&17u8, Box::new(|| Value::new(()))).unwrap_err();
        assert!(matches!(err, FixtureError::TransactionStubUnsupported));
    }

    #[test]
    #[serial]
    fn test_failing_custom_setter_keeps_its_cause() {
        let _guard = override_factories(|factories| {
            factories.register_transaction_stub_setter(|_, _| Err("ledger is read-only".into()));
        });

        let err = set_transaction_stub(&(), Box::new(|| Value::new(()))).unwrap_err();

        assert!(matches!(err, FixtureError::TransactionStubFailed { .. }));
        assert_eq!(err.root_cause().to_string(), "ledger is read-only");
    }

    #[test]
    #[serial]
    fn test_override_closure_may_use_global_registry() {
        reset_global_factories();
        register_mock_factory(constant_factory("before"));

        {
            let _guard = override_factories(|factories| {
                let current = global_factories();
                factories.register_stub_factory(constant_factory("inner"));
                register_strict_mock_factory(constant_factory("ignored"));
                assert_eq!(call(&current, FakeKind::Mock), "before");
            });
            // the adjusted copy replaces whatever the closure registered globally
            assert_eq!(call(&global_factories(), FakeKind::Stub), "inner");
            assert_eq!(call(&global_factories(), FakeKind::Mock), "before");
        }

        assert_eq!(call(&global_factories(), FakeKind::Mock), "before");
        reset_global_factories();
    }
}
