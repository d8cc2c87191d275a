//! Built-in fake backend
//!
//! The default factories behind every [`FakeKind`]. They never synthesize
//! behaviour on their own; a type is faked by, in order:
//! 1. the faker registered for that kind on the catalog
//! 2. for concrete types, the accessible constructor matching the supplied
//!    arguments (the nested object is built for real, with faked dependencies)
//!
//! Anything else is `NoFakeBackend`.

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use crate::catalog::TypeDescriptor;
use crate::error::{BoxError, FixtureError};
use crate::fakes::{FakeFactory, FakeKind, TransactionStubSetter, TransactionSupplier};
use crate::types::{Args, Value};

pub fn default_factory(kind: FakeKind) -> FakeFactory {
    Arc::new(move |descriptor: &TypeDescriptor, args: Vec<Value>| {
        fabricate(kind, descriptor, args)
    })
}

pub fn fabricate(
    kind: FakeKind,
    descriptor: &TypeDescriptor,
    args: Vec<Value>,
) -> Result<Value, BoxError> {
    if let Some(faker) = descriptor.faker(kind) {
        tracing::trace!("Faking {} as {} ({} args)", descriptor.name(), kind, args.len());
        return faker(kind, Args::new(args));
    }

    let keys: Vec<_> = args.iter().map(Value::key).collect();
    if let Some(constructor) = descriptor.constructor_for(&keys) {
        tracing::trace!(
            "No {} faker for {}, constructing it from {:?}",
            kind,
            descriptor.name(),
            keys
        );
        return constructor.invoke(Args::new(args));
    }

    Err(FixtureError::NoFakeBackend {
        type_name: descriptor.name(),
        kind,
    }
    .into())
}

// ============================================================================
// Transaction stubbing
// ============================================================================

/// Capability for fakes whose transaction-creation method can be stubbed
pub trait TransactionStubbing {
    fn returns_transaction(&self, supplier: TransactionSupplier);
}

/// The default setter understands fakes handed over as `Arc<dyn TransactionStubbing>`
/// or as a [`TransactionStub`].
pub fn default_transaction_stub_setter() -> TransactionStubSetter {
    Arc::new(|fake: &dyn Any, supplier: TransactionSupplier| {
        if let Some(stubbing) = fake.downcast_ref::<Arc<dyn TransactionStubbing>>() {
            stubbing.returns_transaction(supplier);
            return Ok(());
        }
        if let Some(stub) = fake.downcast_ref::<TransactionStub>() {
            stub.returns_transaction(supplier);
            return Ok(());
        }
        Err(FixtureError::TransactionStubUnsupported.into())
    })
}

/// Ready-made transaction factory fake
#[derive(Default)]
pub struct TransactionStub {
    supplier: RefCell<Option<TransactionSupplier>>,
}

impl TransactionStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stubbed(&self) -> bool {
        self.supplier.borrow().is_some()
    }

    /// What the faked creation method returns; `None` until stubbed
    pub fn begin(&self) -> Option<Value> {
        self.supplier.borrow().as_ref().map(|supplier| supplier())
    }

    /// Like [`TransactionStub::begin`], cast to the transaction type
    pub fn begin_as<T: 'static>(&self) -> Result<Option<T>, FixtureError> {
        self.begin().map(Value::cast::<T>).transpose()
    }
}

impl TransactionStubbing for TransactionStub {
    fn returns_transaction(&self, supplier: TransactionSupplier) {
        *self.supplier.borrow_mut() = Some(supplier);
    }
}
