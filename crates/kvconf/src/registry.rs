//! Named factories for instantiating values by name.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use kvconf_tokenizer::normalize_name;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::Value;

type Factory = Box<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

struct Registration {
    name: String,
    normalized: String,
    produces: TypeId,
    type_name: &'static str,
    factory: Factory,
}

/// Maps type names to factories.
///
/// A value such as `Pet = Cat` on a member of type `T` instantiates the factory
/// registered as `Cat` for `T`, when no converter for `T` accepts the text.
/// Names compare with whitespace removed and case ignored.
#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<Vec<Arc<Registration>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` as `name`, producing values of `T`.
    ///
    /// Registering the same name for the same `T` again replaces the factory.
    pub fn register<T, F>(&self, name: &str, factory: F)
    where
        T: Value,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let registration = Registration {
            name: name.trim().to_string(),
            normalized: normalize_name(name),
            produces: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: Box::new(move || -> Box<dyn Any + Send> { Box::new(factory()) }),
        };
        debug!(
            "registering type {:?} for {}",
            registration.name, registration.type_name
        );
        let mut entries = self.entries.write();
        entries.retain(|entry| {
            entry.normalized != registration.normalized || entry.produces != registration.produces
        });
        entries.push(Arc::new(registration));
    }

    /// Look up a registered name.
    pub fn resolve(&self, name: &str) -> Option<TypeRef> {
        let normalized = normalize_name(name);
        let entries = self.entries.read();
        let entry = entries.iter().find(|entry| entry.normalized == normalized)?;
        Some(TypeRef {
            name: entry.name.clone(),
            produces: entry.produces,
            type_name: entry.type_name,
        })
    }

    /// Instantiate the factory registered as `name` for `T`.
    pub fn create<T: Value>(&self, name: &str) -> Option<T> {
        let value = self.create_erased(name, TypeId::of::<T>())?;
        value.downcast::<T>().ok().map(|value| *value)
    }

    pub(crate) fn create_erased(&self, name: &str, produces: TypeId) -> Option<Box<dyn Any + Send>> {
        let normalized = normalize_name(name);
        let entry = self
            .entries
            .read()
            .iter()
            .find(|entry| entry.normalized == normalized && entry.produces == produces)
            .cloned()?;
        trace!("instantiating {:?} as {}", entry.name, entry.type_name);
        Some((entry.factory)())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|entry| entry.name.clone()).collect()
    }
}

/// A reference to a registered type, assignable from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    name: String,
    produces: TypeId,
    type_name: &'static str,
}

impl TypeRef {
    /// The name it was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Rust type the factory produces.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn produces<T: Value>(&self) -> bool {
        self.produces == TypeId::of::<T>()
    }

    /// Instantiate through `registry`.
    pub fn create<T: Value>(&self, registry: &TypeRegistry) -> Option<T> {
        if !self.produces::<T>() {
            return None;
        }
        registry.create(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Value for TypeRef {}
