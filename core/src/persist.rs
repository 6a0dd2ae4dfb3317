//! sled-backed implementations of the cache store and the document repository.
//! Both live in one sled database, in the `cache` and `documents` trees.

use crate::repository::{now_rfc3339, DocumentRecord, DocumentRepository};
use crate::store::KeyValueStore;
use crate::{DocId, Error, Result};
use std::path::Path;
use std::sync::Arc;

const CACHE_TREE: &str = "cache";
const DOCUMENTS_TREE: &str = "documents";

/// Open (or create) the data directory and return its cache store and repository.
pub fn open<P: AsRef<Path>>(path: P) -> Result<(Arc<SledStore>, Arc<SledRepository>)> {
    let db = sled::open(path.as_ref())?;
    let store = SledStore::new(&db)?;
    let repository = SledRepository::new(&db)?;
    tracing::info!(path = %path.as_ref().display(), documents = repository.tree.len(), "opened data directory");
    Ok((Arc::new(store), Arc::new(repository)))
}

pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(Self { tree: db.open_tree(CACHE_TREE)? })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.tree.contains_key(key)?)
    }

    fn remove_prefix(&self, prefix: &str) -> Result<()> {
        for entry in self.tree.scan_prefix(prefix).keys() {
            self.tree.remove(entry?)?;
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        for entry in self.tree.scan_prefix(prefix) {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| Error::Codec(e.to_string()))?;
            out.push((key, value.to_vec()));
        }
        Ok(out)
    }
}

/// Records keyed by big-endian id so iteration order is id order.
pub struct SledRepository {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledRepository {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(Self { db: db.clone(), tree: db.open_tree(DOCUMENTS_TREE)? })
    }

    fn put(&self, record: &DocumentRecord) -> Result<()> {
        let bytes = bincode::serialize(record)?;
        self.tree.insert(record.id.to_be_bytes(), bytes)?;
        Ok(())
    }
}

impl DocumentRepository for SledRepository {
    fn all(&self) -> Result<Vec<DocumentRecord>> {
        let mut records = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    fn get(&self, id: DocId) -> Result<Option<DocumentRecord>> {
        match self.tree.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn get_many(&self, ids: &[DocId]) -> Result<Vec<DocumentRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(*id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn create(&self, content: &str, tokens: Vec<String>) -> Result<DocumentRecord> {
        // generate_id is monotonic across restarts and starts at 0
        let id = self.db.generate_id()? + 1;
        let record = DocumentRecord {
            id,
            content: content.to_string(),
            tokens,
            created_at: now_rfc3339(),
            updated_at: None,
        };
        self.put(&record)?;
        Ok(record)
    }

    fn update(&self, id: DocId, content: &str, tokens: Vec<String>) -> Result<DocumentRecord> {
        let mut record = self.get(id)?.ok_or(Error::NotFound(id))?;
        record.content = content.to_string();
        record.tokens = tokens;
        record.updated_at = Some(now_rfc3339());
        self.put(&record)?;
        Ok(record)
    }

    fn delete(&self, id: DocId) -> Result<()> {
        self.tree.remove(id.to_be_bytes())?.map(|_| ()).ok_or(Error::NotFound(id))
    }
}
