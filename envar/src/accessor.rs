use std::cell::OnceCell;
use std::path::Path;
use std::rc::Rc;

use envar_core::adapter::{OverlayEnv, PutEnv};
use envar_core::{EnvRepository, RepositoryBuilder};
use tracing::{debug, warn};

use crate::config::EnvConfig;
use crate::{EnvError, EnvResult, EnvValue, dotenv};

/// Reads environment variables through a lazily built, immutable [`EnvRepository`].
///
/// Construct one accessor and pass it by reference to whatever needs configuration.
/// The repository is built on first use and kept until the put-env setting or the
/// allow list changes. Variables written through the repository live in an overlay
/// owned by the accessor, so they survive those rebuilds.
#[derive(Debug)]
pub struct EnvAccessor {
    put_env: bool,
    allow_list: Option<Vec<String>>,
    overlay: Rc<OverlayEnv>,
    repository: OnceCell<EnvRepository>,
}

impl Default for EnvAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvAccessor {
    /// An accessor without the put-env adapter and without an allow list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            put_env: false,
            allow_list: None,
            overlay: Rc::default(),
            repository: OnceCell::new(),
        }
    }

    /// Build an accessor from configuration and load its dotenv files in order.
    ///
    /// Missing dotenv files are skipped.
    ///
    /// # Safety
    ///
    /// When `config.put_env` is set, the contract of [`enable_put_env`](Self::enable_put_env) applies.
    #[allow(unsafe_code)]
    pub unsafe fn from_config(config: &EnvConfig) -> EnvResult<Self> {
        for key in config.unrecognized.keys() {
            warn!("Ignoring unrecognized configuration key '{key}'");
        }
        let mut accessor = Self::new();
        accessor.allow_list.clone_from(&config.allow_list);
        accessor.put_env = config.put_env;
        for path in &config.dotenv {
            accessor.load_dotenv_if_present(path)?;
        }
        Ok(accessor)
    }

    /// Include the put-env adapter, so writes also reach the process environment.
    ///
    /// # Safety
    ///
    /// Until put-env is disabled again or the accessor is dropped, no other thread may
    /// access the process environment. See [`PutEnv::new`].
    #[allow(unsafe_code)]
    pub unsafe fn enable_put_env(&mut self) {
        self.put_env = true;
        self.invalidate();
    }

    /// Leave the put-env adapter out, so writes stay inside the accessor.
    pub fn disable_put_env(&mut self) {
        self.put_env = false;
        self.invalidate();
    }

    /// Returns `true` if writes also reach the process environment.
    #[must_use]
    pub fn is_put_env_enabled(&self) -> bool {
        self.put_env
    }

    /// Restrict the repository to the given keys, or lift the restriction with `None`.
    pub fn set_allow_list(&mut self, keys: Option<Vec<String>>) {
        self.allow_list = keys;
        self.invalidate();
    }

    /// Returns `true` if a repository is currently memoized.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.repository.get().is_some()
    }

    /// The memoized repository, built on first call.
    #[allow(unsafe_code)]
    pub fn repository(&self) -> &EnvRepository {
        self.repository.get_or_init(|| {
            debug!(put_env = self.put_env, "Creating environment repository");
            let mut builder = RepositoryBuilder::with_overlay(Rc::clone(&self.overlay));
            if self.put_env {
                // SAFETY: `put_env` is only set by `enable_put_env` or `from_config`,
                // whose callers took on the exclusive-access contract.
                builder = builder.add_adapter(unsafe { PutEnv::new() });
            }
            if let Some(keys) = &self.allow_list {
                builder = builder.allow_list(keys.iter().cloned());
            }
            builder.immutable().make()
        })
    }

    /// The normalized value of `key`, or `None` if it is not set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<EnvValue> {
        self.repository()
            .get(key)
            .map(|raw| EnvValue::normalize(&raw))
    }

    /// The normalized value of `key`, or `default` unchanged if it is not set.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<EnvValue>) -> EnvValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// The normalized value of `key`, or the result of `default` if it is not set.
    ///
    /// `default` is only called when the key is missing.
    #[must_use]
    pub fn get_or_else<F, V>(&self, key: &str, default: F) -> EnvValue
    where
        F: FnOnce() -> V,
        V: Into<EnvValue>,
    {
        self.get(key).unwrap_or_else(|| default().into())
    }

    /// Expand `$VAR` and `${VAR}` references in `template` from the repository.
    pub fn substitute(&self, template: &str) -> EnvResult<String> {
        subst::substitute(template, self.repository())
            .map_err(|e| EnvError::SubstitutionError(e, template.to_string()))
    }

    /// Load a dotenv file into the repository, see [`dotenv::load_dotenv`].
    pub fn load_dotenv(&self, path: impl AsRef<Path>) -> EnvResult<usize> {
        dotenv::load_dotenv(self.repository(), path.as_ref())
    }

    /// Load a dotenv file into the repository if it exists.
    pub fn load_dotenv_if_present(&self, path: impl AsRef<Path>) -> EnvResult<usize> {
        dotenv::load_dotenv_if_present(self.repository(), path.as_ref())
    }

    fn invalidate(&mut self) {
        if self.repository.take().is_some() {
            debug!("Dropping cached environment repository");
        }
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use std::cell::Cell;
    use std::env::var_os;

    use pretty_assertions::assert_eq;
    use serial_test::{parallel, serial};
    use tracing_test::traced_test;

    use super::*;

    fn with_put_env() -> EnvAccessor {
        let mut env = EnvAccessor::new();
        // SAFETY: tests that enable put-env are `#[serial]`, every other env test is `#[parallel]`.
        unsafe { env.enable_put_env() };
        env
    }

    #[test]
    #[parallel]
    fn test_missing_key_returns_default() {
        let env = EnvAccessor::new();
        assert!(!env.is_put_env_enabled());
        assert_eq!(env.get("ENVAR_ACCESSOR_MISSING"), None);
        assert_eq!(env.get_or("ENVAR_ACCESSOR_MISSING", "d"), "d");
        assert_eq!(env.get_or("ENVAR_ACCESSOR_MISSING", None::<&str>), EnvValue::Null);
        // defaults are returned as given, not normalized
        assert_eq!(env.get_or("ENVAR_ACCESSOR_MISSING", "true"), "true");
    }

    #[test]
    #[parallel]
    fn test_lazy_default() {
        let env = EnvAccessor::new();
        let calls = Cell::new(0);
        let fallback = || {
            calls.set(calls.get() + 1);
            "computed"
        };

        assert_eq!(env.get_or_else("ENVAR_ACCESSOR_LAZY", fallback), "computed");
        assert_eq!(calls.get(), 1);

        assert!(env.repository().set("ENVAR_ACCESSOR_LAZY", "set"));
        assert_eq!(env.get_or_else("ENVAR_ACCESSOR_LAZY", fallback), "set");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    #[parallel]
    fn test_normalizes_values() {
        let env = EnvAccessor::new();
        let repo = env.repository();
        assert!(repo.set("ENVAR_ACCESSOR_BOOL", "TRUE"));
        assert!(repo.set("ENVAR_ACCESSOR_QUOTED", "'quoted'"));
        assert!(repo.set("ENVAR_ACCESSOR_NULL", "(null)"));
        assert!(repo.set("ENVAR_ACCESSOR_EMPTY", "(empty)"));

        assert_eq!(env.get("ENVAR_ACCESSOR_BOOL"), Some(EnvValue::Bool(true)));
        assert_eq!(env.get_or("ENVAR_ACCESSOR_QUOTED", "d"), "quoted");
        assert_eq!(env.get_or("ENVAR_ACCESSOR_NULL", "d"), EnvValue::Null);
        assert_eq!(env.get_or("ENVAR_ACCESSOR_EMPTY", "d"), "");
    }

    #[test]
    #[serial]
    #[traced_test]
    fn test_toggle_rebuilds_repository() {
        let mut env = with_put_env();
        assert!(!env.is_built());
        assert_eq!(env.repository().writer_count(), 2);
        assert!(env.is_built());

        env.disable_put_env();
        assert!(!env.is_built());
        assert!(!env.is_put_env_enabled());
        assert_eq!(env.repository().writer_count(), 1);
        assert!(env.repository().set("ENVAR_ACCESSOR_OVERLAY", "loaded"));
        assert_eq!(var_os("ENVAR_ACCESSOR_OVERLAY"), None);

        // SAFETY: this test is `#[serial]`.
        unsafe { env.enable_put_env() };
        assert!(!env.is_built());
        assert_eq!(env.get_or("ENVAR_ACCESSOR_OVERLAY", "d"), "loaded");
        assert_eq!(env.repository().writer_count(), 2);
        assert!(env.repository().is_immutable());
        // the rebuilt repository did not write the variable, so it is kept as is
        assert!(!env.repository().set("ENVAR_ACCESSOR_OVERLAY", "replaced"));
        assert_eq!(var_os("ENVAR_ACCESSOR_OVERLAY"), None);
        assert!(logs_contain("Dropping cached environment repository"));
    }

    #[test]
    #[serial]
    fn test_put_env_reaches_process() {
        let env = with_put_env();
        assert!(env.repository().set("ENVAR_ACCESSOR_PUT", "yes"));
        assert_eq!(var_os("ENVAR_ACCESSOR_PUT"), Some("yes".into()));
        assert!(env.repository().clear("ENVAR_ACCESSOR_PUT"));
        assert_eq!(var_os("ENVAR_ACCESSOR_PUT"), None);
    }

    #[test]
    #[serial]
    fn test_put_env_refuses_nul_everywhere() {
        let env = with_put_env();
        assert!(!env.repository().set("ENVAR_ACCESSOR_NUL", "a\0b"));
        assert_eq!(env.get("ENVAR_ACCESSOR_NUL"), None);
        assert!(env.repository().set("ENVAR_ACCESSOR_NUL", "clean"));
        assert_eq!(env.get_or("ENVAR_ACCESSOR_NUL", "d"), "clean");
        assert!(env.repository().clear("ENVAR_ACCESSOR_NUL"));
    }

    #[test]
    #[parallel]
    fn test_existing_process_variable_is_kept() {
        let env = EnvAccessor::new();
        assert!(env.get("PATH").is_some());
        assert!(!env.repository().set("PATH", "/nowhere"));
        assert_ne!(env.get_or("PATH", ""), "/nowhere");
    }

    #[test]
    #[parallel]
    fn test_allow_list() {
        let mut env = EnvAccessor::new();
        env.set_allow_list(Some(vec!["ENVAR_ACCESSOR_ALLOWED".to_string()]));
        assert_eq!(env.get("PATH"), None);
        assert!(env.repository().set("ENVAR_ACCESSOR_ALLOWED", "ok"));
        assert_eq!(env.get_or("ENVAR_ACCESSOR_ALLOWED", "d"), "ok");

        env.set_allow_list(None);
        assert!(env.get("PATH").is_some());
        assert_eq!(env.get_or("ENVAR_ACCESSOR_ALLOWED", "d"), "ok");
    }

    #[test]
    #[parallel]
    fn test_substitute() {
        let env = EnvAccessor::new();
        assert!(env.repository().set("ENVAR_ACCESSOR_HOST", "db.local"));
        assert_eq!(
            env.substitute("postgres://${ENVAR_ACCESSOR_HOST}/app").unwrap(),
            "postgres://db.local/app"
        );
        let err = env.substitute("${ENVAR_ACCESSOR_UNDEFINED}").unwrap_err();
        assert!(matches!(err, EnvError::SubstitutionError(..)));
    }
}
