#[cfg(any(test, feature = "test-support"))]
use std::cell::RefCell;
#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-support"))]
use std::ffi::OsString;

#[cfg(any(test, feature = "test-support"))]
use super::{Env, EnvWriter};

/// Test implementation with configurable environment variables.
///
/// Won't touch the global process environment. Values are stored as [`OsString`]
/// so invalid Unicode can be simulated with [`FauxEnv::insert_os`].
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct FauxEnv(RefCell<HashMap<String, OsString>>);

#[cfg(any(test, feature = "test-support"))]
impl FauxEnv {
    /// Set `key` to a possibly non-Unicode value.
    pub fn insert_os(&self, key: impl Into<String>, value: impl Into<OsString>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    /// Returns `true` if `key` is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl<K: Into<String>, V: Into<OsString>> FromIterator<(K, V)> for FauxEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(RefCell::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Env for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.borrow().get(key).cloned()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl EnvWriter for FauxEnv {
    fn write(&self, key: &str, value: &str) -> bool {
        self.insert_os(key, value);
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.0.borrow_mut().remove(key);
        true
    }
}
