//! Document lifecycle glue: persists through the repository, then notifies the
//! similarity index synchronously so a mutation is visible to duplicate lookups
//! as soon as the call returns.

use crate::config::SimilarityConfig;
use crate::duplicates::DuplicateResultCache;
use crate::engine::SimilarityEngine;
use crate::groups::{DuplicateGroup, DuplicateGroupBuilder};
use crate::repository::{DocumentRecord, DocumentRepository};
use crate::store::KeyValueStore;
use crate::tokenizer::Tokenizer;
use crate::{DocId, Document, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A record as returned to callers, with its current duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: DocId,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(rename = "duplicate_article_ids")]
    pub duplicate_ids: Vec<DocId>,
}

impl DocumentView {
    fn new(record: DocumentRecord, duplicate_ids: Vec<DocId>) -> Self {
        Self {
            id: record.id,
            content: record.content,
            created_at: record.created_at,
            updated_at: record.updated_at,
            duplicate_ids,
        }
    }
}

pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    tokenizer: Arc<dyn Tokenizer>,
    duplicates: DuplicateResultCache,
}

impl DocumentService {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        store: Arc<dyn KeyValueStore>,
        tokenizer: Arc<dyn Tokenizer>,
        config: SimilarityConfig,
    ) -> Self {
        let engine = Arc::new(SimilarityEngine::new(store, config));
        Self { repository, tokenizer, duplicates: DuplicateResultCache::new(engine) }
    }

    pub fn engine(&self) -> &Arc<SimilarityEngine> { self.duplicates.engine() }

    pub fn duplicates(&self) -> &DuplicateResultCache { &self.duplicates }

    /// Build the index from every stored document and pre-compute their result lists.
    pub fn init(&self) -> Result<()> {
        let documents: Vec<Document> = self.repository.all()?.iter().map(DocumentRecord::to_document).collect();
        tracing::info!(documents = documents.len(), "loading documents into similarity index");
        self.engine().init(documents.clone())?;
        self.duplicates.reset()?;
        for document in &documents {
            self.duplicates.find_duplicates(document, true)?;
        }
        tracing::info!("similarity cache warmed");
        Ok(())
    }

    pub fn get(&self, id: DocId) -> Result<DocumentView> {
        let record = self.repository.get(id)?.ok_or(Error::NotFound(id))?;
        let duplicate_ids = self.duplicates.find_duplicates(&record.to_document(), true)?;
        Ok(DocumentView::new(record, duplicate_ids))
    }

    /// All documents in id order. With `unique_only`, documents already reported as
    /// a duplicate of an earlier listed document are skipped.
    pub fn list(&self, unique_only: bool) -> Result<Vec<DocumentView>> {
        let mut views = Vec::new();
        let mut seen_duplicates: HashSet<DocId> = HashSet::new();
        for record in self.repository.all()? {
            if unique_only && seen_duplicates.contains(&record.id) {
                continue;
            }
            let duplicate_ids = self.duplicates.find_duplicates(&record.to_document(), true)?;
            seen_duplicates.extend(duplicate_ids.iter().copied());
            views.push(DocumentView::new(record, duplicate_ids));
        }
        Ok(views)
    }

    pub fn create(&self, content: &str) -> Result<DocumentView> {
        let tokens = self.tokenizer.tokenize(content);
        let record = self.repository.create(content, tokens)?;
        let document = record.to_document();
        self.duplicates.on_document_created(document.clone())?;
        let duplicate_ids = self.duplicates.find_duplicates(&document, true)?;
        tracing::info!(id = record.id, duplicates = duplicate_ids.len(), "document created");
        Ok(DocumentView::new(record, duplicate_ids))
    }

    pub fn update(&self, id: DocId, content: &str) -> Result<DocumentView> {
        let old = self.repository.get(id)?.ok_or(Error::NotFound(id))?;
        let tokens = self.tokenizer.tokenize(content);
        let record = self.repository.update(id, content, tokens)?;
        let document = record.to_document();
        self.duplicates.on_document_updated(&old.to_document(), document.clone())?;
        let duplicate_ids = self.duplicates.find_duplicates(&document, true)?;
        tracing::info!(id, duplicates = duplicate_ids.len(), "document updated");
        Ok(DocumentView::new(record, duplicate_ids))
    }

    pub fn remove(&self, id: DocId) -> Result<()> {
        self.repository.delete(id)?;
        self.duplicates.on_document_removed(id)?;
        tracing::info!(id, "document removed");
        Ok(())
    }

    /// Stored documents duplicating `text`, which itself is not stored.
    pub fn check(&self, text: &str) -> Result<Vec<DocumentRecord>> {
        let tokens = self.tokenizer.tokenize(text);
        let ids = self.duplicates.check(&tokens)?;
        self.repository.get_many(&ids)
    }

    pub fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let documents: Vec<Document> = self.repository.all()?.iter().map(DocumentRecord::to_document).collect();
        DuplicateGroupBuilder::new(&self.duplicates).build_groups(&documents)
    }
}
