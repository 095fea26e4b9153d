use std::env::{remove_var, set_var, var_os};
use std::ffi::OsString;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::warn;

use super::{Env, EnvWriter, is_valid_key};

/// Put-env adapter: reads and writes the process environment block.
///
/// Writing the process environment is only sound while no other thread reads or writes it,
/// so the adapter can only be created through [`PutEnv::new`] and never leaves its thread.
#[derive(Debug)]
pub struct PutEnv(PhantomData<Rc<()>>);

impl PutEnv {
    /// Create the adapter.
    ///
    /// # Safety
    ///
    /// While the adapter, or a repository holding it, is alive, no other thread may
    /// access the process environment, whether through `std::env` or through libc
    /// functions such as `getenv`.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn new() -> Self {
        Self(PhantomData)
    }
}

impl Env for PutEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        if is_valid_key(key) { var_os(key) } else { None }
    }
}

impl EnvWriter for PutEnv {
    fn accepts(&self, key: &str, value: Option<&str>) -> bool {
        is_valid_key(key) && value.is_none_or(|v| !v.contains('\0'))
    }

    #[allow(unsafe_code)]
    fn write(&self, key: &str, value: &str) -> bool {
        if !self.accepts(key, Some(value)) {
            warn!("Refusing to put invalid environment variable {key:?} into the process environment");
            return false;
        }
        // SAFETY: `PutEnv::new` requires exclusive access to the process environment
        // for as long as this adapter lives, and the adapter is `!Send`.
        unsafe { set_var(key, value) };
        true
    }

    #[allow(unsafe_code)]
    fn delete(&self, key: &str) -> bool {
        if !self.accepts(key, None) {
            return false;
        }
        // SAFETY: see `write`.
        unsafe { remove_var(key) };
        true
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[allow(unsafe_code)]
    fn put_env() -> PutEnv {
        // SAFETY: every test touching the process environment is `#[serial]`.
        unsafe { PutEnv::new() }
    }

    #[test]
    #[serial]
    fn test_put_env_round_trip() {
        let env = put_env();
        let key = "ENVAR_CORE_PUT_ENV_ROUND_TRIP";
        assert!(env.write(key, "hello"));
        assert_eq!(var_os(key), Some(OsString::from("hello")));
        assert_eq!(env.get_env_str(key), Some("hello".to_string()));

        assert!(env.delete(key));
        assert_eq!(var_os(key), None);
    }

    #[test]
    #[serial]
    fn test_put_env_rejects_invalid() {
        let env = put_env();
        assert!(!env.accepts("ENVAR_CORE_PUT_ENV_NUL", Some("a\0b")));
        assert!(env.accepts("ENVAR_CORE_PUT_ENV_NUL", None));
        assert!(!env.write("", "x"));
        assert!(!env.write("A=B", "x"));
        assert!(!env.write("ENVAR_CORE_PUT_ENV_NUL", "a\0b"));
        assert!(!env.delete("A\0B"));
        assert_eq!(var_os("ENVAR_CORE_PUT_ENV_NUL"), None);
    }
}
