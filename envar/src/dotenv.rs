use std::path::Path;

use envar_core::EnvRepository;
use tracing::{debug, trace};

use crate::{EnvError, EnvResult};

/// Parse a `.env` file and write every entry through `repository`.
///
/// Entries the repository rejects, for example variables an immutable repository
/// found already defined, are skipped. Returns the number of entries written.
pub fn load_dotenv(repository: &EnvRepository, path: &Path) -> EnvResult<usize> {
    let to_err = |e| EnvError::DotenvLoadError(e, path.to_path_buf());
    let mut written = 0;
    for entry in dotenvy::from_path_iter(path).map_err(to_err)? {
        let (key, value) = entry.map_err(to_err)?;
        if repository.set(&key, &value) {
            written += 1;
        } else {
            trace!("Skipping {key} from {}", path.display());
        }
    }
    debug!("Loaded {written} variables from {}", path.display());
    Ok(written)
}

/// Same as [`load_dotenv`], but a missing file loads nothing instead of failing.
pub fn load_dotenv_if_present(repository: &EnvRepository, path: &Path) -> EnvResult<usize> {
    match load_dotenv(repository, path) {
        Err(EnvError::DotenvLoadError(e, _)) if e.not_found() => {
            debug!("Dotenv file {} does not exist, skipping", path.display());
            Ok(0)
        }
        res => res,
    }
}
