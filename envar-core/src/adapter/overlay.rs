use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;

use super::{Env, EnvWriter};

/// In-memory variables layered in front of the process environment.
///
/// Writes stay inside this adapter, so a repository built without
/// [`PutEnv`](super::PutEnv) never changes what other code sees through `std::env`.
#[derive(Debug, Default)]
pub struct OverlayEnv(RefCell<HashMap<String, String>>);

impl OverlayEnv {
    /// Number of variables currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Env for OverlayEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.borrow().get(key).map(Into::into)
    }
}

impl EnvWriter for OverlayEnv {
    fn write(&self, key: &str, value: &str) -> bool {
        self.0.borrow_mut().insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.0.borrow_mut().remove(key);
        true
    }
}
