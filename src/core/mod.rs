pub mod dependent;
pub mod params;
pub mod resolver;
pub mod signature;
pub mod types;
pub mod validator;

pub use crate::domain::model::{DefaultValue, Person, Solved, TestObj};
pub use crate::domain::ports::{Param, ParamFactory};
pub use crate::utils::error::Result;
