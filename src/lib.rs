//! Declaratively wired module graphs.
//!
//! A pipeline is described by a YAML document naming module types, their
//! parameters and their dependencies. [`ConfigReader`] substitutes
//! `${PLACEHOLDER}` parameters, instantiates every module through a
//! [`ModuleFactory`], checks that each dependency edge connects compatible
//! interface types and resolves which outputs are exposed. [`Pipeline::run`]
//! then executes the graph and returns the exposed outputs by label.

extern crate self as modflow;

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod nodes;
pub mod observability;
pub mod registry;

pub use config::ConfigReader;
pub use core::{InterfaceType, Module, Payload};
pub use engine::{ExecutionMode, Pipeline, PipelineName, RunReport, RuntimeResults};
pub use error::{Error, ErrorCategory, Result};
pub use registry::{ModuleDescriptor, ModuleFactory, ModuleType};

#[doc(hidden)]
pub use inventory;
