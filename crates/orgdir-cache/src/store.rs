//! # Key/Value Store Capability
//!
//! The subset of Redis semantics the synchronizer relies on: plain string
//! keys and hashes with per-field merge. Injected into `CacheSynchronizer`
//! so tests and tools can swap the backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::CacheError;

/// Key/value store used for derived records.
///
/// Deleting an absent key or field is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Set one field of a hash, leaving other fields untouched.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;

    /// Set several fields of a hash at once.
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<(), CacheError>;

    /// All fields of a hash; empty when the key is absent.
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError>;

    async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError>;
}

/// A value held by [`MemoryCacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Str(String),
    Hash(BTreeMap<String, String>),
}

/// Process-local store with Redis-like typing rules.
///
/// A hash whose last field is deleted disappears, as in Redis.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole keyspace, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn with_hash<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> Result<Option<T>, CacheError> {
        let mut entries = self.entries.lock();
        if create {
            entries
                .entry(key.to_string())
                .or_insert_with(|| StoredValue::Hash(BTreeMap::new()));
        }
        let out = match entries.get_mut(key) {
            None => None,
            Some(StoredValue::Hash(hash)) => Some(f(hash)),
            Some(StoredValue::Str(_)) => {
                return Err(CacheError::WrongType {
                    key: key.to_string(),
                })
            }
        };
        if matches!(entries.get(key), Some(StoredValue::Hash(h)) if h.is_empty()) {
            entries.remove(key);
        }
        Ok(out)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.entries.lock().get(key) {
            None => Ok(None),
            Some(StoredValue::Str(s)) => Ok(Some(s.clone())),
            Some(StoredValue::Hash(_)) => Err(CacheError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .insert(key.to_string(), StoredValue::Str(value.to_string()));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        self.with_hash(key, true, |h| {
            h.insert(field.to_string(), value.to_string());
        })?;
        Ok(())
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.with_hash(key, true, |h| {
            for (field, value) in fields {
                h.insert(field.clone(), value.clone());
            }
        })?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError> {
        Ok(self
            .with_hash(key, false, |h| h.clone())?
            .unwrap_or_default())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
        self.with_hash(key, false, |h| {
            h.remove(field);
        })?;
        Ok(())
    }
}
