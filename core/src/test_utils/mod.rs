//! Test utilities
//!
//! Fixture types and mocks shared by the unit tests.
//!
//! The capability traits are mocked with `mockall`; everything else is a plain
//! struct registered on [`fixture_catalog`], so each test starts from the same
//! object graph:
//!
//! - `OrderService(Arc<dyn Repository>, i32, String)`, plus a one-argument constructor
//! - `Auditor(Arc<dyn Clock>)` and `Auditor(Arc<dyn Clock>, OrderService)`
//! - `Chicken(Egg)` / `Egg(Chicken)`, a deliberate cycle

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
