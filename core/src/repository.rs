use crate::{DocId, Document, Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;

/// A stored document with its server-assigned timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocId,
    pub content: String,
    pub tokens: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl DocumentRecord {
    pub fn to_document(&self) -> Document {
        Document::new(self.id, self.content.clone(), self.tokens.clone())
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into())
}

/// Persistent document storage. Ids start at 1 and are never reused.
pub trait DocumentRepository: Send + Sync {
    /// Every record in ascending id order.
    fn all(&self) -> Result<Vec<DocumentRecord>>;
    fn get(&self, id: DocId) -> Result<Option<DocumentRecord>>;
    fn get_many(&self, ids: &[DocId]) -> Result<Vec<DocumentRecord>>;
    fn create(&self, content: &str, tokens: Vec<String>) -> Result<DocumentRecord>;
    fn update(&self, id: DocId, content: &str, tokens: Vec<String>) -> Result<DocumentRecord>;
    fn delete(&self, id: DocId) -> Result<()>;
}

#[derive(Default)]
struct MemoryInner {
    records: BTreeMap<DocId, DocumentRecord>,
    last_id: DocId,
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<MemoryInner>,
}

impl MemoryRepository {
    pub fn new() -> Self { Self::default() }
}

impl DocumentRepository for MemoryRepository {
    fn all(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.inner.read().records.values().cloned().collect())
    }

    fn get(&self, id: DocId) -> Result<Option<DocumentRecord>> {
        Ok(self.inner.read().records.get(&id).cloned())
    }

    fn get_many(&self, ids: &[DocId]) -> Result<Vec<DocumentRecord>> {
        let inner = self.inner.read();
        Ok(ids.iter().filter_map(|id| inner.records.get(id).cloned()).collect())
    }

    fn create(&self, content: &str, tokens: Vec<String>) -> Result<DocumentRecord> {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let record = DocumentRecord {
            id: inner.last_id,
            content: content.to_string(),
            tokens,
            created_at: now_rfc3339(),
            updated_at: None,
        };
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, id: DocId, content: &str, tokens: Vec<String>) -> Result<DocumentRecord> {
        let mut inner = self.inner.write();
        let record = inner.records.get_mut(&id).ok_or(Error::NotFound(id))?;
        record.content = content.to_string();
        record.tokens = tokens;
        record.updated_at = Some(now_rfc3339());
        Ok(record.clone())
    }

    fn delete(&self, id: DocId) -> Result<()> {
        self.inner.write().records.remove(&id).map(|_| ()).ok_or(Error::NotFound(id))
    }
}
