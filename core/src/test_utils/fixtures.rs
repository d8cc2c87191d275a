//! Test fixtures
//!
//! Fixture types and the catalog that describes them.

use std::fmt;
use std::sync::Arc;

use crate::catalog::TypeCatalog;
use crate::fakes::FakeKind;
use crate::params;

use super::mocks::{clock_at, stub_clock, stub_repository, Clock, MockClock, MockRepository, Repository};

pub struct OrderService {
    pub repo: Arc<dyn Repository>,
    pub retries: i32,
    pub label: String,
}

impl OrderService {
    pub fn new(repo: Arc<dyn Repository>, retries: i32, label: String) -> Self {
        Self {
            repo,
            retries,
            label,
        }
    }

    pub fn with_repo(repo: Arc<dyn Repository>) -> Self {
        Self::new(repo, 3, "default".to_string())
    }
}

impl fmt::Debug for OrderService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderService")
            .field("retries", &self.retries)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

pub struct Auditor {
    pub clock: Arc<dyn Clock>,
    pub service: Option<OrderService>,
}

impl fmt::Debug for Auditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auditor")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

#[allow(dead_code)]
pub struct Chicken {
    pub egg: Box<Egg>,
}

#[allow(dead_code)]
pub struct Egg {
    pub chicken: Box<Chicken>,
}

/// Catalog describing every fixture type, with mockall-backed fakers for the
/// capability traits:
/// - stubs answer with neutral values
/// - mocks of `Clock` report a fixed timestamp
/// - strict mocks carry no expectations at all
pub fn fixture_catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();

    catalog
        .register_capability::<Arc<dyn Repository>>()
        .fakes(|kind, _| {
            let repo: Arc<dyn Repository> = match kind {
                FakeKind::StrictMock => Arc::new(MockRepository::new()),
                _ => Arc::new(stub_repository()),
            };
            Ok(repo)
        });

    catalog
        .register_capability::<Arc<dyn Clock>>()
        .fakes(|kind, _| {
            let clock: Arc<dyn Clock> = match kind {
                FakeKind::Mock => Arc::new(clock_at(1_700_000_000)),
                FakeKind::StrictMock => Arc::new(MockClock::new()),
                _ => Arc::new(stub_clock()),
            };
            Ok(clock)
        });

    catalog
        .register_concrete::<OrderService>()
        .constructor(params![Arc<dyn Repository>], |args| {
            Ok(OrderService::with_repo(args.take()?))
        })
        .constructor(params![Arc<dyn Repository>, i32, String], |args| {
            Ok(OrderService::new(args.take()?, args.take()?, args.take()?))
        })
        .fake(FakeKind::Mock, |args| {
            Ok(OrderService::new(args.take()?, 0, "mocked".to_string()))
        });

    catalog
        .register_concrete::<Auditor>()
        .constructor(params![Arc<dyn Clock>], |args| {
            Ok(Auditor {
                clock: args.take()?,
                service: None,
            })
        })
        .constructor(params![Arc<dyn Clock>, OrderService], |args| {
            Ok(Auditor {
                clock: args.take()?,
                service: Some(args.take()?),
            })
        });

    catalog
        .register_concrete::<Chicken>()
        .constructor(params![Egg], |args| {
            Ok(Chicken {
                egg: Box::new(args.take()?),
            })
        });
    catalog
        .register_concrete::<Egg>()
        .constructor(params![Chicken], |args| {
            Ok(Egg {
                chicken: Box::new(args.take()?),
            })
        });

    catalog
}

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fakeforge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
