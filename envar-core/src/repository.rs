use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use subst::VariableMap;
use tracing::{debug, trace};

use crate::adapter::{Env, EnvWriter, OsEnv, OverlayEnv};

/// Composes adapters into an [`EnvRepository`].
///
/// Readers are consulted in insertion order, the first one holding a value wins.
/// Writers all receive every change.
pub struct RepositoryBuilder {
    readers: Vec<Rc<dyn Env>>,
    writers: Vec<Rc<dyn EnvWriter>>,
    immutable: bool,
    allow_list: Option<HashSet<String>>,
}

impl RepositoryBuilder {
    /// A builder with no readers and no writers.
    #[must_use]
    pub fn without_adapters() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
            immutable: false,
            allow_list: None,
        }
    }

    /// A builder with an [`OverlayEnv`] as reader and writer, followed by [`OsEnv`] as reader.
    #[must_use]
    pub fn with_default_adapters() -> Self {
        Self::with_overlay(Rc::default())
    }

    /// Like [`with_default_adapters`](Self::with_default_adapters), but over an existing overlay,
    /// so variables written by earlier repositories stay visible.
    #[must_use]
    pub fn with_overlay(overlay: Rc<OverlayEnv>) -> Self {
        Self::without_adapters().add_adapter(overlay).add_reader(OsEnv)
    }

    /// Append a reader.
    #[must_use]
    pub fn add_reader<R: Env + 'static>(mut self, reader: R) -> Self {
        self.readers.push(Rc::new(reader));
        self
    }

    /// Append a writer.
    #[must_use]
    pub fn add_writer<W: EnvWriter + 'static>(mut self, writer: W) -> Self {
        self.writers.push(Rc::new(writer));
        self
    }

    /// Append an adapter that is used both as a reader and as a writer.
    #[must_use]
    pub fn add_adapter<A: Env + EnvWriter + 'static>(mut self, adapter: A) -> Self {
        let adapter = Rc::new(adapter);
        self.readers.push(Rc::clone(&adapter) as Rc<dyn Env>);
        self.writers.push(adapter);
        self
    }

    /// Never overwrite or clear variables that were defined outside the repository.
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Restrict reads and writes to the given keys.
    #[must_use]
    pub fn allow_list<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Build the repository.
    #[must_use]
    pub fn make(self) -> EnvRepository {
        debug!(
            readers = self.readers.len(),
            writers = self.writers.len(),
            immutable = self.immutable,
            "Building environment repository"
        );
        EnvRepository {
            readers: self.readers,
            writers: self.writers,
            immutable: self.immutable,
            allow_list: self.allow_list,
            loaded: RefCell::default(),
        }
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

impl fmt::Debug for RepositoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .field("immutable", &self.immutable)
            .field("allow_list", &self.allow_list)
            .finish()
    }
}

/// A key to string mapping over a fixed set of adapters.
///
/// The set of adapters cannot change once built. In immutable mode the repository
/// remembers which keys it wrote itself, and only those may be overwritten or cleared.
pub struct EnvRepository {
    readers: Vec<Rc<dyn Env>>,
    writers: Vec<Rc<dyn EnvWriter>>,
    immutable: bool,
    allow_list: Option<HashSet<String>>,
    loaded: RefCell<HashSet<String>>,
}

impl EnvRepository {
    /// Read `key` from the first reader that has it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if !self.is_allowed(key) {
            return None;
        }
        self.readers.iter().find_map(|r| r.get_env_str(key))
    }

    /// Returns `true` if any reader has `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` through every writer.
    ///
    /// Returns `false` when the key is not allowed, when an immutable repository
    /// would overwrite an externally defined variable, or when a writer refused it.
    /// A refusal found by [`EnvWriter::accepts`] leaves every writer untouched.
    pub fn set(&self, key: &str, value: &str) -> bool {
        if !self.is_allowed(key) {
            return false;
        }
        if self.is_externally_defined(key) {
            trace!("Not overwriting externally defined environment variable {key}");
            return false;
        }
        if !self.writers.iter().all(|w| w.accepts(key, Some(value))) {
            trace!("Environment variable {key} was refused by a writer");
            return false;
        }
        // keep writing after a failure, the key is owned either way
        let written = self
            .writers
            .iter()
            .fold(true, |ok, w| w.write(key, value) && ok);
        if self.immutable {
            self.loaded.borrow_mut().insert(key.to_string());
        }
        written
    }

    /// Remove `key` through every writer.
    ///
    /// Readers without write access, such as [`OsEnv`], may still report the key afterwards.
    pub fn clear(&self, key: &str) -> bool {
        if !self.is_allowed(key) {
            return false;
        }
        if self.is_externally_defined(key) {
            trace!("Not clearing externally defined environment variable {key}");
            return false;
        }
        if !self.writers.iter().all(|w| w.accepts(key, None)) {
            return false;
        }
        let deleted = self.writers.iter().fold(true, |ok, w| w.delete(key) && ok);
        if deleted {
            self.loaded.borrow_mut().remove(key);
        }
        deleted
    }

    /// Returns `true` if writes are rejected for variables defined elsewhere.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Number of writers behind this repository.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }

    fn is_allowed(&self, key: &str) -> bool {
        !key.is_empty() && self.allow_list.as_ref().is_none_or(|keys| keys.contains(key))
    }

    fn is_externally_defined(&self, key: &str) -> bool {
        self.immutable && !self.loaded.borrow().contains(key) && self.has(key)
    }
}

impl fmt::Debug for EnvRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvRepository")
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .field("immutable", &self.immutable)
            .field("allow_list", &self.allow_list)
            .field("loaded", &self.loaded.borrow())
            .finish()
    }
}

impl<'a> VariableMap<'a> for EnvRepository {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        Self::get(self, key)
    }
}
