pub mod document;
pub mod params;
pub mod reader;

pub use document::{ExposeDirective, NodeSpec, PipelineDocument};
pub use reader::ConfigReader;
