use super::PreferenceBackend;
use crate::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory preference backend.
///
/// Uses DashMap for concurrent access. Values vanish with the process.
#[derive(Default)]
pub struct InMemoryBackend {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PreferenceBackend for InMemoryBackend {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
