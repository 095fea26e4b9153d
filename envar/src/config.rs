use std::collections::BTreeMap;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EnvError, EnvResult};

/// Values of keys this version does not understand, kept so they can be reported.
pub type UnrecognizedValues = BTreeMap<String, serde_yaml::Value>;

/// Settings for [`EnvAccessor::from_config`](crate::EnvAccessor::from_config).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Write loaded variables into the process environment as well (default `false`).
    pub put_env: bool,

    /// Dotenv files to load, in order. Earlier files win because the repository is immutable.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dotenv: Vec<PathBuf>,

    /// Only these keys can be read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<Vec<String>>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            put_env: false,
            dotenv: Vec::new(),
            allow_list: None,
            unrecognized: UnrecognizedValues::new(),
        }
    }
}

/// Read and parse a YAML configuration file.
pub fn read_config(file_name: &Path) -> EnvResult<EnvConfig> {
    let mut file = File::open(file_name)
        .map_err(|e| EnvError::ConfigLoadError(e, file_name.to_path_buf()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| EnvError::ConfigLoadError(e, file_name.to_path_buf()))?;
    parse_config(&contents, file_name)
}

/// Parse YAML configuration. `file_name` is only used in error messages.
pub fn parse_config(contents: &str, file_name: &Path) -> EnvResult<EnvConfig> {
    serde_yaml::from_str(contents)
        .map_err(|e| EnvError::ConfigParseError(e, file_name.to_path_buf()))
}
