//! Persistent user preferences.
//!
//! `Preferences` layers registered defaults over a [`PreferenceBackend`].
//! Reads return the stored value when present, otherwise the registered
//! default. Removing a stored value makes the key read exactly as if it had
//! never been set.
//!
//! Backends:
//! - `RocksDbBackend` - durable, every write synced before returning
//! - `InMemoryBackend` - process-local, for tests and ephemeral sessions

pub mod memory;
pub mod rocks;

pub use memory::InMemoryBackend;
pub use rocks::RocksDbBackend;

use crate::setting::Setting;
use crate::{CadenceError, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const LANGUAGE_KEY: &str = "cadence.language";
pub const MUTED_KEY: &str = "cadence.muted";

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Every key owned by the speech facade, cleared on reset.
pub fn all_keys() -> impl Iterator<Item = &'static str> {
    [LANGUAGE_KEY, MUTED_KEY]
        .into_iter()
        .chain(Setting::ALL.into_iter().map(Setting::key))
}

/// Raw key-value storage behind `Preferences`.
///
/// Writes must be durable by the time they return; callers read values back
/// immediately after setting them.
pub trait PreferenceBackend: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put_raw(&self, key: &str, value: &[u8]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed preference access with registered defaults
#[derive(Clone)]
pub struct Preferences {
    backend: Arc<dyn PreferenceBackend>,
    defaults: Arc<RwLock<HashMap<String, Value>>>,
}

impl Preferences {
    /// Wrap a backend and register the standard setting defaults.
    pub fn new(backend: Arc<dyn PreferenceBackend>) -> Self {
        let prefs = Self {
            backend,
            defaults: Arc::new(RwLock::new(HashMap::new())),
        };
        prefs.register_defaults(
            Setting::ALL
                .iter()
                .map(|s| (s.key().to_string(), Value::from(s.default_value()))),
        );
        prefs
    }

    /// Preferences that live only as long as the process
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }

    /// Supply fallback values. Stored values are never touched; an earlier
    /// registration for the same key is replaced.
    pub fn register_defaults<I, K>(&self, defaults: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut registered = self.defaults.write();
        for (key, value) in defaults {
            let key = key.into();
            debug!(target = "cadence", key = %key, value = %value, "Registered default");
            registered.insert(key, value);
        }
    }

    pub fn has_default(&self, key: &str) -> bool {
        self.defaults.read().contains_key(key)
    }

    /// Stored value, else registered default, else `None`.
    pub fn get_optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if let Some(bytes) = self.backend.get_raw(key)? {
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }
        match self.defaults.read().get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_optional(key)?
            .ok_or_else(|| CadenceError::MissingDefault(key.to_string()))
    }

    /// Whether an explicit value is stored (registered defaults don't count)
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.backend.get_raw(key)?.is_some())
    }

    pub fn set<V: Serialize>(&self, key: &str, value: &V) -> Result<()> {
        let serialized = serde_json::to_vec(value)?;
        self.backend.put_raw(key, &serialized)?;
        debug!(target = "cadence", key, "Stored preference");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }

    pub fn load_setting(&self, setting: Setting) -> Result<f32> {
        self.get(setting.key())
    }

    /// Persist a setting, clamped into its range.
    pub fn store_setting(&self, setting: Setting, value: f32) -> Result<()> {
        self.set(setting.key(), &setting.clamp(value))
    }

    pub fn language(&self) -> Result<String> {
        Ok(self
            .get_optional::<String>(LANGUAGE_KEY)?
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }

    pub fn set_language(&self, language: &str) -> Result<()> {
        self.set(LANGUAGE_KEY, &language)
    }

    pub fn muted(&self) -> Result<bool> {
        Ok(self.get_optional::<bool>(MUTED_KEY)?.unwrap_or(false))
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.set(MUTED_KEY, &muted)
    }

    /// Remove every stored facade preference.
    pub fn clear(&self) -> Result<()> {
        for key in all_keys() {
            self.backend.remove(key)?;
        }
        self.backend.flush()
    }
}
