//! Environment variable access through swappable adapters.
//!
//! Provides the [`Env`] trait for reading and the [`EnvWriter`] trait for writing,
//! so storage can be mocked in tests and layered in a [`crate::EnvRepository`].
//!
//! - [`OsEnv`]: Reads the process environment
//! - [`OverlayEnv`]: In-memory layer that never touches the process environment
//! - [`PutEnv`]: Reads and writes the process environment
//! - [`FauxEnv`]: Test implementation

use std::ffi::OsString;
use std::rc::Rc;

use tracing::warn;

mod faux;
mod os;
mod overlay;
mod put;

#[cfg(any(test, feature = "test-support"))]
pub use faux::FauxEnv;
pub use os::OsEnv;
pub use overlay::OverlayEnv;
pub use put::PutEnv;

/// Read access to an environment variable store, with Unicode validation.
pub trait Env {
    /// Get an environment variable as an [`OsString`] without Unicode validation.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Get an environment variable as a UTF-8 validated [`String`].
    ///
    /// Logs a warning and returns `None` if the variable contains invalid Unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        match self.var_os(key)?.into_string() {
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }
}

/// Write access to an environment variable store.
///
/// Both methods report whether the store accepted the change.
pub trait EnvWriter {
    /// Whether a later [`write`](Self::write) of `value`, or a [`delete`](Self::delete)
    /// when `value` is `None`, would be accepted. Checked before any writer is touched.
    fn accepts(&self, _key: &str, _value: Option<&str>) -> bool {
        true
    }

    /// Set `key` to `value`.
    fn write(&self, key: &str, value: &str) -> bool;

    /// Remove `key`. Removing a key that is not set succeeds.
    fn delete(&self, key: &str) -> bool;
}

impl<T: Env + ?Sized> Env for Rc<T> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        (**self).var_os(key)
    }
}

impl<T: EnvWriter + ?Sized> EnvWriter for Rc<T> {
    fn accepts(&self, key: &str, value: Option<&str>) -> bool {
        (**self).accepts(key, value)
    }

    fn write(&self, key: &str, value: &str) -> bool {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }
}

/// The process environment rejects names that are empty or contain `=` or NUL.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0'])
}
