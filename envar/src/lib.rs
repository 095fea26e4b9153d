#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

mod accessor;
pub use accessor::EnvAccessor;

/// Accessor configuration, usually read from a YAML file.
pub mod config;

mod dotenv;
pub use dotenv::{load_dotenv, load_dotenv_if_present};

mod error;
pub use error::{EnvError, EnvResult};

mod value;
pub use value::EnvValue;

pub use envar_core::{EnvRepository, RepositoryBuilder, adapter};
