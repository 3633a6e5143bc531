pub mod interface;
pub mod module;
pub mod payload;

pub use interface::InterfaceType;
pub use module::Module;
pub use payload::Payload;
