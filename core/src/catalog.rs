//! Type catalog
//!
//! Rust has no runtime reflection, so every type the engine may need to produce
//! is registered here: its classification, its constructors and (optionally) the
//! fakers the built-in backend uses for it. The catalog answers the three
//! questions resolution depends on:
//! - how is this type classified ([`TypeCatalog::classify`])
//! - which constructors can the builder see ([`TypeCatalog::list_accessible_constructors`])
//! - which one should it use ([`TypeCatalog::select_constructor`])

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, FixtureError};
use crate::fakes::FakeKind;
use crate::types::{Args, TypeKey, TypeKind, Value};

/// Function that instantiates a type from positional arguments
pub type ConstructFn = Arc<dyn Fn(Args) -> Result<Value, BoxError> + Send + Sync>;

/// Per-type faker used by the built-in backend
pub type Faker = Arc<dyn Fn(FakeKind, Args) -> Result<Value, BoxError> + Send + Sync>;

type ZeroFn = fn() -> Value;
type DuplicateFn = fn(&Value) -> Option<Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Public and protected constructors are visible to the builder
    pub fn is_accessible(self) -> bool {
        !matches!(self, Visibility::Private)
    }
}

/// Ordered parameter types of one constructor
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstructorSignature {
    params: Vec<TypeKey>,
}

impl ConstructorSignature {
    pub fn new(params: Vec<TypeKey>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn matches(&self, keys: &[TypeKey]) -> bool {
        self.params == keys
    }
}

#[derive(Clone)]
pub struct Constructor {
    signature: ConstructorSignature,
    visibility: Visibility,
    invoke: ConstructFn,
}

impl Constructor {
    pub fn signature(&self) -> &ConstructorSignature {
        &self.signature
    }

    pub fn params(&self) -> &[TypeKey] {
        self.signature.params()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn invoke(&self, args: Args) -> Result<Value, BoxError> {
        (self.invoke)(args)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.signature.params)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// Everything the catalog knows about one type
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    declared: TypeKind,
    zero: Option<ZeroFn>,
    duplicate: Option<DuplicateFn>,
    constructors: Vec<Constructor>,
    fakers: HashMap<FakeKind, Faker>,
}

impl TypeDescriptor {
    fn new(key: TypeKey, declared: TypeKind) -> Self {
        Self {
            key,
            declared,
            zero: None,
            duplicate: None,
            constructors: Vec::new(),
            fakers: HashMap::new(),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// Kind the type was registered as, before constructor visibility is considered
    pub fn declared_kind(&self) -> TypeKind {
        self.declared
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn accessible_constructors(&self) -> impl Iterator<Item = &Constructor> {
        self.constructors
            .iter()
            .filter(|c| c.visibility.is_accessible())
    }

    /// First accessible constructor whose signature matches `keys` exactly
    pub fn constructor_for(&self, keys: &[TypeKey]) -> Option<&Constructor> {
        self.accessible_constructors()
            .find(|c| c.signature.matches(keys))
    }

    pub fn faker(&self, kind: FakeKind) -> Option<&Faker> {
        self.fakers.get(&kind)
    }

    pub fn zero_value(&self) -> Option<Value> {
        self.zero.map(|zero| zero())
    }

    /// Copy a value of this type, if the type was registered as cloneable
    pub fn duplicate(&self, value: &Value) -> Option<Value> {
        self.duplicate.and_then(|dup| dup(value))
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("declared", &self.declared)
            .field("constructors", &self.constructors)
            .field("fakers", &self.fakers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn zero_of<T: Default + 'static>() -> Value {
    Value::new(T::default())
}

fn duplicate_of<T: Clone + 'static>(value: &Value) -> Option<Value> {
    value.downcast_ref::<T>().map(|v| Value::new(v.clone()))
}

/// Registration table standing in for runtime reflection
#[derive(Clone, Debug)]
pub struct TypeCatalog {
    types: HashMap<TypeKey, TypeDescriptor>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! register_primitives {
    ($catalog:expr, $($ty:ty),+ $(,)?) => {
        $( $catalog.register_primitive::<$ty>(); )+
    };
}

impl TypeCatalog {
    /// Catalog with the standard primitives and `String` pre-registered
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        register_primitives!(
            catalog, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
            f32, f64, (),
        );

        let key = TypeKey::of::<String>();
        let mut text = TypeDescriptor::new(key, TypeKind::Text);
        text.zero = Some(zero_of::<String>);
        text.duplicate = Some(duplicate_of::<String>);
        catalog.types.insert(key, text);

        catalog
    }

    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register a value type whose zero state is its `Default`
    pub fn register_primitive<T: Default + Clone + 'static>(&mut self) -> &mut Self {
        let key = TypeKey::of::<T>();
        let mut descriptor = TypeDescriptor::new(key, TypeKind::Primitive);
        descriptor.zero = Some(zero_of::<T>);
        descriptor.duplicate = Some(duplicate_of::<T>);
        self.types.insert(key, descriptor);
        self
    }

    /// Register a capability type, typically `Arc<dyn Trait>`
    pub fn register_capability<T: Clone + 'static>(&mut self) -> TypeRegistration<'_, T> {
        let registration = self.registration::<T>(TypeKind::Capability);
        registration.descriptor.duplicate = Some(duplicate_of::<T>);
        registration
    }

    /// Register a concrete type; add its constructors on the returned registration
    pub fn register_concrete<T: 'static>(&mut self) -> TypeRegistration<'_, T> {
        self.registration::<T>(TypeKind::Concrete)
    }

    fn registration<T: 'static>(&mut self, kind: TypeKind) -> TypeRegistration<'_, T> {
        let key = TypeKey::of::<T>();
        let descriptor = self
            .types
            .entry(key)
            .and_modify(|existing| existing.declared = kind)
            .or_insert_with(|| TypeDescriptor::new(key, kind));
        TypeRegistration {
            descriptor,
            _type: PhantomData,
        }
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.types.contains_key(&key)
    }

    pub fn describe(&self, key: TypeKey) -> Result<&TypeDescriptor, FixtureError> {
        self.types.get(&key).ok_or(FixtureError::UnknownType {
            type_name: key.name(),
        })
    }

    /// Classify a type: primitives and text by registration, then a type with
    /// no accessible constructor is a capability, everything else is concrete.
    pub fn classify(&self, key: TypeKey) -> Result<TypeKind, FixtureError> {
        let descriptor = self.describe(key)?;
        Ok(match descriptor.declared {
            TypeKind::Primitive => TypeKind::Primitive,
            TypeKind::Text => TypeKind::Text,
            TypeKind::Capability => TypeKind::Capability,
            TypeKind::Concrete if descriptor.accessible_constructors().next().is_none() => {
                TypeKind::Capability
            }
            TypeKind::Concrete => TypeKind::Concrete,
        })
    }

    pub fn list_accessible_constructors(
        &self,
        key: TypeKey,
    ) -> Result<Vec<&ConstructorSignature>, FixtureError> {
        Ok(self
            .describe(key)?
            .accessible_constructors()
            .map(Constructor::signature)
            .collect())
    }

    /// Pick the accessible constructor with the most (or fewest) parameters.
    /// Ties go to the constructor registered first.
    pub fn select_constructor(
        &self,
        key: TypeKey,
        most_parameters: bool,
    ) -> Result<&Constructor, FixtureError> {
        let mut selected: Option<&Constructor> = None;
        for candidate in self.describe(key)?.accessible_constructors() {
            let better = match selected {
                None => true,
                Some(current) if most_parameters => {
                    candidate.signature.arity() > current.signature.arity()
                }
                Some(current) => candidate.signature.arity() < current.signature.arity(),
            };
            if better {
                selected = Some(candidate);
            }
        }

        let constructor = selected.ok_or(FixtureError::NoAccessibleConstructor {
            type_name: key.name(),
        })?;
        tracing::debug!(
            "Selected constructor {:?} for {} (most_parameters = {})",
            constructor.params(),
            key,
            most_parameters
        );
        Ok(constructor)
    }
}

/// Chainable registration handle for one type
pub struct TypeRegistration<'a, T> {
    descriptor: &'a mut TypeDescriptor,
    _type: PhantomData<fn() -> T>,
}

impl<'a, T: 'static> TypeRegistration<'a, T> {
    /// Add a public constructor
    pub fn constructor<F>(self, params: Vec<TypeKey>, construct: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.constructor_with(Visibility::Public, params, construct)
    }

    pub fn constructor_with<F>(
        self,
        visibility: Visibility,
        params: Vec<TypeKey>,
        construct: F,
    ) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.descriptor.constructors.push(Constructor {
            signature: ConstructorSignature::new(params),
            visibility,
            invoke: Arc::new(move |mut args: Args| construct(&mut args).map(Value::new)),
        });
        self
    }

    /// Teach the built-in backend how to fake this type for one kind of fake.
    /// Capability fakers receive no arguments; concrete fakers receive the
    /// resolved constructor arguments.
    pub fn fake<F>(self, kind: FakeKind, faker: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.descriptor.fakers.insert(
            kind,
            Arc::new(move |_: FakeKind, mut args: Args| faker(&mut args).map(Value::new)),
        );
        self
    }

    /// Same faker for every kind; the closure is told which kind was requested.
    pub fn fakes<F>(self, faker: F) -> Self
    where
        F: Fn(FakeKind, &mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let faker: Faker =
            Arc::new(move |kind: FakeKind, mut args: Args| faker(kind, &mut args).map(Value::new));
        for kind in FakeKind::ALL {
            self.descriptor.fakers.insert(kind, faker.clone());
        }
        self
    }
}

impl<'a, T: Clone + 'static> TypeRegistration<'a, T> {
    /// Allow values of this type to fill a parameter declared more than once
    pub fn cloneable(self) -> Self {
        self.descriptor.duplicate = Some(duplicate_of::<T>);
        self
    }
}
