use crate::core::{InterfaceType, Module};

/// Static capability metadata of a module type
#[derive(Debug, Clone, Default)]
pub struct ModuleDescriptor {
    accepts: Vec<&'static InterfaceType>,
    produces: Option<&'static InterfaceType>,
    finalized: bool,
    expose: Option<String>,
}

impl ModuleDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(mut self, interface: &'static InterfaceType) -> Self {
        if !self.accepts.contains(&interface) {
            self.accepts.push(interface);
        }
        self
    }

    pub fn produce(mut self, interface: &'static InterfaceType) -> Self {
        self.produces = Some(interface);
        self
    }

    pub fn expose(mut self, label: impl Into<String>) -> Self {
        self.expose = Some(label.into());
        self
    }

    /// Marks the type as complete enough to be instantiated in a graph
    pub fn finalize(mut self) -> Self {
        self.finalized = true;
        self
    }

    pub fn accepts(&self) -> &[&'static InterfaceType] {
        &self.accepts
    }

    pub fn produces(&self) -> Option<&'static InterfaceType> {
        self.produces
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn declared_expose(&self) -> Option<&str> {
        self.expose.as_deref()
    }

    /// True if `interface` is one of the accepted interfaces or a subtype of one
    pub fn accepts_interface(&self, interface: &InterfaceType) -> bool {
        self.accepts
            .iter()
            .any(|accepted| interface.is_subtype_of(accepted))
    }
}

/// A module implementation with its descriptor attached.
///
/// Usually implemented with `#[derive(ModuleType)]`.
pub trait ModuleType: Module + Default + 'static {
    fn descriptor() -> ModuleDescriptor;
}
