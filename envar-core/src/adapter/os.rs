use std::env::var_os;
use std::ffi::OsString;

use super::Env;

/// Production reader that accesses the process environment.
///
/// Read-only: pair it with [`PutEnv`](super::PutEnv) to write back into the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        if super::is_valid_key(key) {
            var_os(key)
        } else {
            None
        }
    }
}
