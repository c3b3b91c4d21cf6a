pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ResolverConfig;

pub use core::dependent::{Dependent, ModelField, ParseOptions};
pub use core::params::{depends, DependsMarker, ParamRegistry, ValueParam};
pub use core::resolver::{parse, Resolver};
pub use core::signature::{Callable, Parameter, Scope};
pub use core::types::{Injected, Kwargs, TypeExpr, TypeInfo};
pub use domain::model::{Person, TestObj};
pub use utils::error::{DiError, Result};
