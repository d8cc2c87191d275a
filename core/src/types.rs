//! Core value types
//!
//! `TypeKey` identifies a declared type, `Value` is an opaque handle to an
//! instance of one, and `Args` is the positional argument list handed to
//! constructors and fakers.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::FixtureError;

/// Identity of a declared type
///
/// Equality and hashing use the `TypeId` only; the name is carried for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Build a `Vec<TypeKey>` from a list of types, for constructor signatures.
///
/// ```
/// use fakeforge::{params, TypeKey};
///
/// let signature = params![i32, String];
/// assert_eq!(signature, vec![TypeKey::of::<i32>(), TypeKey::of::<String>()]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::TypeKey>::new()
    };
    ($($ty:ty),+ $(,)?) => {
        vec![$($crate::TypeKey::of::<$ty>()),+]
    };
}

/// Closed classification of a declared type, computed by the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Has an always-constructible zero state
    Primitive,
    /// The text-string type; resolves to an empty string
    Text,
    /// No accessible constructor; only a fake can satisfy it
    Capability,
    /// Instantiable through one of its constructors
    Concrete,
}

/// Opaque handle to an instance, tagged with the type it was created as
pub struct Value {
    key: TypeKey,
    inner: Box<dyn Any>,
}

impl Value {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inner: Box::new(value),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.inner.downcast_mut::<T>()
    }

    /// Recover the concrete value, or hand the handle back on mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, Value> {
        let key = self.key;
        match self.inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Value { key, inner }),
        }
    }

    /// Like [`Value::downcast`], but reports the mismatch as an error.
    pub fn cast<T: 'static>(self) -> Result<T, FixtureError> {
        self.downcast::<T>().map_err(|value| FixtureError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: value.key.name(),
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value").field("type", &self.key).finish()
    }
}

/// Positional arguments for a constructor, faker or partial-mock factory
#[derive(Debug, Default)]
pub struct Args {
    values: VecDeque<Value>,
    position: usize,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Types of the remaining arguments, in order
    pub fn keys(&self) -> Vec<TypeKey> {
        self.values.iter().map(Value::key).collect()
    }

    /// Take the next positional argument as `T`.
    pub fn take<T: 'static>(&mut self) -> Result<T, FixtureError> {
        let position = self.position;
        let value = self
            .values
            .pop_front()
            .ok_or(FixtureError::MissingArgument {
                position,
                expected: std::any::type_name::<T>(),
            })?;
        self.position += 1;
        value.cast::<T>()
    }

    /// Look at the argument at `index` without consuming anything.
    pub fn peek<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(Value::downcast_ref::<T>)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values.into()
    }
}
