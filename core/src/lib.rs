//! fakeforge
//!
//! Builds fully-formed instances for tests. Dependencies the test supplies are
//! used as-is; every other constructor parameter is filled automatically with a
//! zero value, an empty string, or a fake produced by a pluggable fake factory.
//!
//! ```
//! use std::sync::Arc;
//!
//! use fakeforge::{params, FakeFactories, InstanceBuilder, TypeCatalog};
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> bool;
//! }
//!
//! struct NullMailer;
//! impl Mailer for NullMailer {
//!     fn send(&self, _: &str) -> bool {
//!         false
//!     }
//! }
//!
//! struct Signup {
//!     mailer: Arc<dyn Mailer>,
//!     quota: u32,
//! }
//!
//! let mut catalog = TypeCatalog::new();
//! catalog
//!     .register_capability::<Arc<dyn Mailer>>()
//!     .fakes(|_, _| Ok(Arc::new(NullMailer) as Arc<dyn Mailer>));
//! catalog
//!     .register_concrete::<Signup>()
//!     .constructor(params![Arc<dyn Mailer>, u32], |args| {
//!         Ok(Signup { mailer: args.take()?, quota: args.take()? })
//!     });
//!
//! let mut builder = InstanceBuilder::<Signup>::new(&catalog).with_factories(FakeFactories::new());
//! builder.with(5u32)?;
//! let signup = builder.build(false)?;
//!
//! assert_eq!(signup.quota, 5);
//! assert!(!signup.mailer.send("someone@example.com"));
//! # Ok::<(), fakeforge::FixtureError>(())
//! ```

pub mod backend;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod facade;
pub mod fakes;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod test_utils;


pub use backend::{TransactionStub, TransactionStubbing};
pub use builder::{DependencyOverrides, InstanceBuilder, ResolvedParameters};
pub use catalog::{
    Constructor, ConstructorSignature, TypeCatalog, TypeDescriptor, TypeRegistration, Visibility,
};
pub use config::ResolverConfig;
pub use error::{BoxError, FixtureError};
pub use facade::BuilderFacade;
pub use fakes::{
    global_factories, override_factories, register_mock_factory, register_partial_mock_factory,
    register_strict_mock_factory, register_stub_factory, register_transaction_stub_setter,
    replace_global_factories, reset_global_factories, set_transaction_stub, FactoryOverrideGuard,
    FakeFactories, FakeFactory, FakeKind, TransactionStubSetter, TransactionSupplier,
};
pub use resolver::DependencyResolver;
pub use types::{Args, TypeKey, TypeKind, Value};
