#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Readers and writers over environment variable storage.
pub mod adapter;

mod repository;
pub use repository::{EnvRepository, RepositoryBuilder};
