pub mod descriptor;
pub mod factory;

pub use descriptor::{ModuleDescriptor, ModuleType};
pub use factory::{
    ModuleConstructor, ModuleFactory, ModuleRegistration, ModuleRegistrationFactory,
    ModuleRegistrationWrapper,
};
pub use modflow_macros::ModuleType;
