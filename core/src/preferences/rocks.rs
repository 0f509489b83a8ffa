//! Persistent RocksDB-based preference backend.

use super::PreferenceBackend;
use crate::{CadenceError, Result};
use rocksdb::{Options, WriteOptions, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Preference storage using RocksDB.
///
/// Every put and delete is written with `sync` enabled, so a value is on
/// disk before the call returns.
pub struct RocksDbBackend {
    db: DB,
}

impl RocksDbBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref()).map_err(|e| CadenceError::Storage(e.to_string()))?;

        info!(target = "cadence", path = ?path.as_ref(), "Preference store opened");
        Ok(Arc::new(Self { db }))
    }

    fn sync_writes() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }
}

impl PreferenceBackend for RocksDbBackend {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| CadenceError::Storage(e.to_string()))
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db
            .put_opt(key, value, &Self::sync_writes())
            .map_err(|e| CadenceError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .delete_opt(key, &Self::sync_writes())
            .map_err(|e| CadenceError::Storage(e.to_string()))
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| CadenceError::Storage(e.to_string()))
    }
}
