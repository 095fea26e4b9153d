use std::io;
use std::path::PathBuf;

/// A convenience [`Result`] for the envar crate.
pub type EnvResult<T> = Result<T, EnvError>;

#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("Unable to load dotenv file {1}: {0}")]
    DotenvLoadError(#[source] dotenvy::Error, PathBuf),

    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] serde_yaml::Error, PathBuf),

    #[error("Unable to substitute environment variables in '{1}': {0}")]
    SubstitutionError(#[source] subst::Error, String),
}
