use super::InterfaceType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Value passed between modules, tagged with the interface it satisfies.
///
/// Cloning is cheap: the value itself is shared.
#[derive(Clone)]
pub struct Payload {
    interface: &'static InterfaceType,
    value: Arc<dyn Any + Send + Sync>,
}

impl Payload {
    pub fn new<T: Any + Send + Sync>(interface: &'static InterfaceType, value: T) -> Self {
        Self {
            interface,
            value: Arc::new(value),
        }
    }

    pub fn interface(&self) -> &'static InterfaceType {
        self.interface
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("interface", &self.interface.name())
            .finish_non_exhaustive()
    }
}
