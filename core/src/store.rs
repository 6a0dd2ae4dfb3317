use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Byte-oriented key-value cache the similarity core persists into.
///
/// Typed access lives in [`crate::schema::CacheSchema`]; implementations only move bytes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn contains(&self, key: &str) -> Result<bool>;
    /// Drop every key starting with `prefix`.
    fn remove_prefix(&self, prefix: &str) -> Result<()>;
    /// Every entry whose key starts with `prefix`.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn remove_prefix(&self, prefix: &str) -> Result<()> {
        self.entries.write().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut out: Vec<(String, Vec<u8>)> = self
            .entries
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(!store.contains("a").unwrap());
        store.set("a", vec![1, 2]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![1, 2]));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        // removing an absent key is a no-op
        store.remove("a").unwrap();
    }

    #[test]
    fn prefix_operations() {
        let store = MemoryStore::new();
        store.set("tfidf:token:dog", vec![1]).unwrap();
        store.set("tfidf:token:cat", vec![2]).unwrap();
        store.set("articles:1", vec![3]).unwrap();
        let scanned = store.scan_prefix("tfidf:").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, "tfidf:token:cat");
        store.remove_prefix("tfidf:").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("articles:1").unwrap());
    }
}
