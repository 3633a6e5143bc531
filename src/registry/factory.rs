use super::{ModuleDescriptor, ModuleType};
use crate::core::Module;
use crate::error::{Error, Result, Stage};
use serde_json::Value;
use std::collections::HashMap;

/// Constructor function type for creating module instances
pub type ModuleConstructor = fn() -> Box<dyn Module>;

/// A module type as known to a factory: descriptor plus constructor
#[derive(Clone)]
pub struct ModuleRegistration {
    pub type_name: String,
    pub descriptor: ModuleDescriptor,
    pub constructor: ModuleConstructor,
}

impl ModuleRegistration {
    pub fn new(
        type_name: impl Into<String>,
        descriptor: ModuleDescriptor,
        constructor: ModuleConstructor,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            descriptor,
            constructor,
        }
    }

    pub fn of<T: ModuleType>(type_name: impl Into<String>) -> Self {
        Self::new(type_name, T::descriptor(), construct::<T>)
    }

    /// Create a new, not yet initialized instance of this module type
    pub fn create_instance(&self) -> Box<dyn Module> {
        (self.constructor)()
    }
}

fn construct<T: ModuleType>() -> Box<dyn Module> {
    Box::new(T::default())
}

// Factory type for creating registrations at runtime
pub type ModuleRegistrationFactory = fn() -> ModuleRegistration;

// Wrapper for inventory collection
pub struct ModuleRegistrationWrapper(pub ModuleRegistrationFactory);

// Inventory submission type
inventory::collect!(ModuleRegistrationWrapper);

/// Name to constructor registry used by the graph builder.
///
/// Each factory is independent; nothing is shared between instances unless
/// it is built with [`ModuleFactory::from_inventory`].
#[derive(Clone, Default)]
pub struct ModuleFactory {
    types: HashMap<String, ModuleRegistration>,
}

impl ModuleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory holding every type submitted with `#[module(register = "...")]`
    pub fn from_inventory() -> Self {
        let mut factory = Self::new();
        for wrapper in inventory::iter::<ModuleRegistrationWrapper> {
            factory.insert((wrapper.0)());
        }
        factory
    }

    /// Register `T` under `type_name`; an existing registration is replaced.
    pub fn register<T: ModuleType>(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.insert(ModuleRegistration::of::<T>(type_name))
    }

    pub fn register_with(
        &mut self,
        type_name: impl Into<String>,
        descriptor: ModuleDescriptor,
        constructor: ModuleConstructor,
    ) -> &mut Self {
        self.insert(ModuleRegistration::new(type_name, descriptor, constructor))
    }

    pub fn insert(&mut self, registration: ModuleRegistration) -> &mut Self {
        if self.types.contains_key(&registration.type_name) {
            tracing::debug!(type_name = %registration.type_name, "module type re-registered");
        }
        self.types
            .insert(registration.type_name.clone(), registration);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<&ModuleRegistration> {
        self.types.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Looks up a registration that may be instantiated in a graph.
    ///
    /// `module` is the node name reported in errors.
    pub fn lookup(&self, module: &str, type_name: &str) -> Result<&ModuleRegistration> {
        let registration = self
            .types
            .get(type_name)
            .ok_or_else(|| Error::UnknownModuleType {
                module: module.to_string(),
                type_name: type_name.to_string(),
            })?;

        if !registration.descriptor.is_finalized() {
            return Err(Error::NonFinalizedModule {
                type_name: type_name.to_string(),
            });
        }

        Ok(registration)
    }

    /// Instantiate `type_name` for node `module` and initialize it with `params`
    pub async fn create(
        &self,
        module: &str,
        type_name: &str,
        params: Value,
    ) -> Result<(Box<dyn Module>, &ModuleDescriptor)> {
        let registration = self.lookup(module, type_name)?;

        let mut instance = registration.create_instance();
        instance
            .on_create(params)
            .await
            .map_err(|e| Error::module_failed(module, Stage::Create, e))?;

        Ok((instance, &registration.descriptor))
    }
}
