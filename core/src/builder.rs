//! Instance builder
//!
//! Single-use builder for one target type. Overrides are registered with
//! [`InstanceBuilder::with`]; everything else the target's richest constructor
//! needs is resolved when one of the build variants runs:
//!
//! 1. Enforce single use
//! 2. Select the richest accessible constructor
//! 3. Run the before-resolution hook
//! 4. Resolve every parameter that has no override, through the stub factory
//! 5. Run the before-build hook
//! 6. Reassemble the arguments in declared order
//! 7. Instantiate (plain construction, mock factory or caller-supplied partial mock)
//!
//! Failures in steps 2-7 come back as `BuildFailure` naming the target.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::catalog::TypeCatalog;
use crate::config::ResolverConfig;
use crate::error::{BoxError, FixtureError};
use crate::fakes::{global_factories, FakeFactories, FakeKind};
use crate::resolver::DependencyResolver;
use crate::types::{Args, TypeKey, Value};

/// Explicit dependency values, keyed by declared type
#[derive(Debug, Default)]
pub struct DependencyOverrides {
    values: HashMap<TypeKey, Value>,
}

impl DependencyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<D: 'static>(&mut self, value: D) -> Result<(), FixtureError> {
        self.insert_value(Value::new(value))
    }

    pub fn insert_value(&mut self, value: Value) -> Result<(), FixtureError> {
        let key = value.key();
        if self.values.contains_key(&key) {
            return Err(FixtureError::DuplicateDependency {
                type_name: key.name(),
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn get<D: 'static>(&self) -> Option<&D> {
        self.values
            .get(&TypeKey::of::<D>())
            .and_then(Value::downcast_ref::<D>)
    }

    pub fn get_mut<D: 'static>(&mut self) -> Option<&mut D> {
        self.values
            .get_mut(&TypeKey::of::<D>())
            .and_then(Value::downcast_mut::<D>)
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&mut self, key: TypeKey) -> Option<Value> {
        self.values.remove(&key)
    }

    fn peek(&self, key: TypeKey) -> Option<&Value> {
        self.values.get(&key)
    }
}

/// Values produced by the resolver during one build, keyed by parameter type
#[derive(Debug, Default)]
pub struct ResolvedParameters {
    values: HashMap<TypeKey, Value>,
}

impl ResolvedParameters {
    pub fn contains(&self, key: TypeKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn get<P: 'static>(&self) -> Option<&P> {
        self.values
            .get(&TypeKey::of::<P>())
            .and_then(Value::downcast_ref::<P>)
    }

    pub fn get_mut<P: 'static>(&mut self) -> Option<&mut P> {
        self.values
            .get_mut(&TypeKey::of::<P>())
            .and_then(Value::downcast_mut::<P>)
    }

    /// Swap in a different value for parameter type `P`; returns the old one
    pub fn replace<P: 'static>(&mut self, value: P) -> Option<Value> {
        self.values.insert(TypeKey::of::<P>(), Value::new(value))
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: TypeKey, value: Value) {
        self.values.insert(key, value);
    }

    fn take(&mut self, key: TypeKey) -> Option<Value> {
        self.values.remove(&key)
    }

    fn peek(&self, key: TypeKey) -> Option<&Value> {
        self.values.get(&key)
    }
}

type BeforeResolutionHook = Box<dyn FnMut(&mut DependencyOverrides, &[TypeKey])>;
type BeforeBuildHook = Box<dyn FnMut(&mut DependencyOverrides, &mut ResolvedParameters)>;
type PartialMockFn<T> = Box<dyn FnOnce(Args) -> Result<T, BoxError>>;

enum Instantiation<T> {
    Construct,
    Fake(FakeKind),
    Partial(PartialMockFn<T>),
}

impl<T> Instantiation<T> {
    fn label(&self) -> &'static str {
        match self {
            Instantiation::Construct => "construct",
            Instantiation::Fake(_) => "fake",
            Instantiation::Partial(_) => "partial mock",
        }
    }
}

pub struct InstanceBuilder<'c, T> {
    catalog: &'c TypeCatalog,
    factories: Option<FakeFactories>,
    config: Option<ResolverConfig>,
    overrides: DependencyOverrides,
    built: bool,
    before_resolution: Option<BeforeResolutionHook>,
    before_build: Option<BeforeBuildHook>,
    _target: PhantomData<fn() -> T>,
}

impl<'c, T: 'static> InstanceBuilder<'c, T> {
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self {
            catalog,
            factories: None,
            config: None,
            overrides: DependencyOverrides::new(),
            built: false,
            before_resolution: None,
            before_build: None,
            _target: PhantomData,
        }
    }

    /// Use these factories instead of reading the process-wide registry at build time
    pub fn with_factories(mut self, factories: FakeFactories) -> Self {
        self.factories = Some(factories);
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Called with the overrides and the selected parameter list before any
    /// parameter is resolved; may add last-moment overrides.
    pub fn before_resolution<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut DependencyOverrides, &[TypeKey]) + 'static,
    {
        self.before_resolution = Some(Box::new(hook));
        self
    }

    /// Called with the overrides and the resolved parameters right before instantiation.
    pub fn before_build<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut DependencyOverrides, &mut ResolvedParameters) + 'static,
    {
        self.before_build = Some(Box::new(hook));
        self
    }

    /// Register an explicit value for declared dependency type `D`.
    ///
    /// Only legal before the first build attempt.
    pub fn with<D: 'static>(&mut self, value: D) -> Result<&mut Self, FixtureError> {
        if self.built {
            return Err(FixtureError::SingleUseViolation {
                type_name: TypeKey::of::<T>().name(),
            });
        }
        self.overrides.insert(value)?;
        tracing::trace!("Registered override for {}", TypeKey::of::<D>());
        Ok(self)
    }

    pub fn overrides(&self) -> &DependencyOverrides {
        &self.overrides
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Instantiate the target through its own constructor.
    pub fn build(&mut self, deep: bool) -> Result<T, FixtureError> {
        self.run(deep, Instantiation::Construct)
    }

    /// Instantiate the target through the mock factory; dependencies are still stubs.
    pub fn build_mock(&mut self, deep: bool) -> Result<T, FixtureError> {
        self.run(deep, Instantiation::Fake(FakeKind::Mock))
    }

    /// Instantiate the target with `partial_factory`, handing it the ordered arguments.
    pub fn build_partial_mock<F>(&mut self, deep: bool, partial_factory: F) -> Result<T, FixtureError>
    where
        F: FnOnce(Args) -> Result<T, BoxError> + 'static,
    {
        self.run(deep, Instantiation::Partial(Box::new(partial_factory)))
    }

    fn run(&mut self, deep: bool, strategy: Instantiation<T>) -> Result<T, FixtureError> {
        let target = TypeKey::of::<T>();
        if self.built {
            return Err(FixtureError::SingleUseViolation {
                type_name: target.name(),
            });
        }
        self.built = true;

        tracing::debug!(
            "Building {} (strategy = {}, deep = {})",
            target,
            strategy.label(),
            deep
        );
        let overrides = std::mem::take(&mut self.overrides);
        self.assemble_and_instantiate(target, deep, strategy, overrides)
            .map_err(|source| FixtureError::BuildFailure {
                type_name: target.name(),
                source,
            })
    }

    fn assemble_and_instantiate(
        &mut self,
        target: TypeKey,
        deep: bool,
        strategy: Instantiation<T>,
        mut overrides: DependencyOverrides,
    ) -> Result<T, BoxError> {
        let factories = self.factories.clone().unwrap_or_else(global_factories);
        let config = self
            .config
            .clone()
            .unwrap_or_else(|| ResolverConfig::global().clone());
        let catalog = self.catalog;
        let resolver = DependencyResolver::with_config(catalog, config);

        let constructor = catalog.select_constructor(target, true)?;
        let params = constructor.params().to_vec();

        if let Some(hook) = self.before_resolution.as_mut() {
            hook(&mut overrides, params.as_slice());
        }

        let stub = factories.factory(FakeKind::Stub);
        let mut resolved = ResolvedParameters::default();
        for param in &params {
            if overrides.contains(*param) || resolved.contains(*param) {
                continue;
            }
            resolved.insert(*param, resolver.resolve(*param, &stub, deep)?);
        }

        if let Some(hook) = self.before_build.as_mut() {
            hook(&mut overrides, &mut resolved);
        }

        let args = self.ordered_arguments(&params, &mut overrides, &mut resolved)?;

        let instance = match strategy {
            Instantiation::Construct => constructor.invoke(Args::new(args))?,
            Instantiation::Fake(kind) => {
                let descriptor = catalog.describe(target)?;
                factories.factory(kind)(descriptor, args)?
            }
            Instantiation::Partial(partial_factory) => {
                return partial_factory(Args::new(args));
            }
        };
        Ok(instance.cast::<T>()?)
    }

    /// Lay the values out in the constructor's declared order. A type declared
    /// more than once receives copies of the same value.
    fn ordered_arguments(
        &self,
        params: &[TypeKey],
        overrides: &mut DependencyOverrides,
        resolved: &mut ResolvedParameters,
    ) -> Result<Vec<Value>, FixtureError> {
        let mut remaining: HashMap<TypeKey, usize> = HashMap::new();
        for param in params {
            *remaining.entry(*param).or_default() += 1;
        }

        let mut args = Vec::with_capacity(params.len());
        for (position, param) in params.iter().enumerate() {
            let left = remaining.entry(*param).or_default();
            *left -= 1;
            let last_use = *left == 0;

            let value = if overrides.contains(*param) {
                if last_use {
                    overrides.take(*param)
                } else {
                    self.copy_value(*param, overrides.peek(*param))?
                }
            } else if last_use {
                resolved.take(*param)
            } else {
                self.copy_value(*param, resolved.peek(*param))?
            };

            let value = value.ok_or(FixtureError::MissingArgument {
                position,
                expected: param.name(),
            })?;
            if value.key() != *param {
                return Err(FixtureError::TypeMismatch {
                    expected: param.name(),
                    actual: value.key().name(),
                });
            }
            args.push(value);
        }
        Ok(args)
    }

    fn copy_value(
        &self,
        key: TypeKey,
        value: Option<&Value>,
    ) -> Result<Option<Value>, FixtureError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let not_cloneable = FixtureError::NotCloneable {
            type_name: key.name(),
        };
        match self.catalog.describe(key) {
            Ok(descriptor) => descriptor.duplicate(value).map(Some).ok_or(not_cloneable),
            Err(_) => Err(not_cloneable),
        }
    }
}
