//! Mock implementations
//!
//! `mockall` mocks for the capability traits used by the fixtures, and a
//! recording fake factory that lets tests see which types were faked.

use std::sync::{Arc, Mutex};

use mockall::automock;

use crate::backend;
use crate::catalog::TypeDescriptor;
use crate::error::BoxError;
use crate::fakes::{FakeFactories, FakeFactory, FakeKind};
use crate::types::{TypeKey, Value};

// ============================================================================
// Capability traits
// ============================================================================

#[automock]
pub trait Repository: Send + Sync {
    fn find(&self, id: u32) -> Option<String>;
}

#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Stub repository: answers every lookup with `None`
pub fn stub_repository() -> MockRepository {
    let mut repo = MockRepository::new();
    repo.expect_find().returning(|_| None);
    repo
}

/// Stub clock frozen at zero
pub fn stub_clock() -> MockClock {
    clock_at(0)
}

pub fn clock_at(now: u64) -> MockClock {
    let mut clock = MockClock::new();
    clock.expect_now().return_const(now);
    clock
}

/// Compare two trait-object `Arc`s by the address they point at
pub fn same_arc<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// ============================================================================
// Recording fake factory
// ============================================================================

/// Records `(type, argument count)` for every call, then defers to the
/// built-in backend for its kind.
#[derive(Clone)]
pub struct RecordingFactory {
    kind: FakeKind,
    calls: Arc<Mutex<Vec<(TypeKey, usize)>>>,
}

impl RecordingFactory {
    pub fn new(kind: FakeKind) -> Self {
        Self {
            kind,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(TypeKey, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn factory(&self) -> FakeFactory {
        let recorder = self.clone();
        Arc::new(move |descriptor: &TypeDescriptor, args: Vec<Value>| {
            recorder.record(descriptor, args)
        })
    }

    /// Register this recorder in the slot for its kind
    pub fn install(&self, factories: &mut FakeFactories) {
        let recorder = self.clone();
        let factory = move |descriptor: &TypeDescriptor, args: Vec<Value>| {
            recorder.record(descriptor, args)
        };
        match self.kind {
            FakeKind::Stub => factories.register_stub_factory(factory),
            FakeKind::Mock => factories.register_mock_factory(factory),
            FakeKind::StrictMock => factories.register_strict_mock_factory(factory),
            FakeKind::PartialMock => factories.register_partial_mock_factory(factory),
        };
    }

    fn record(&self, descriptor: &TypeDescriptor, args: Vec<Value>) -> Result<Value, BoxError> {
        self.calls
            .lock()
            .unwrap()
            .push((descriptor.key(), args.len()));
        backend::fabricate(self.kind, descriptor, args)
    }
}
