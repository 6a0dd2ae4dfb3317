use crate::schema::CacheSchema;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type DocId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    /// Normalized, stemmed tokens in text order; repeats count towards term frequency.
    pub tokens: Vec<String>,
}

impl Document {
    pub fn new(id: DocId, content: impl Into<String>, tokens: Vec<String>) -> Self {
        Self { id, content: content.into(), tokens }
    }

    pub fn distinct_tokens(&self) -> BTreeSet<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }
}

/// Ids of the indexed documents containing a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContext {
    pub document_ids: BTreeSet<DocId>,
}

impl TokenContext {
    pub fn document_frequency(&self) -> usize { self.document_ids.len() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    #[serde(rename = "id")]
    pub document_id: DocId,
    pub score: f64,
}

/// Token -> document-id sets, persisted under `tfidf:token:{token}`.
///
/// Every operation is idempotent per (token, document) pair so an interrupted
/// register/unregister can be replayed.
#[derive(Clone)]
pub struct TokenFrequencyIndex {
    cache: CacheSchema,
}

impl TokenFrequencyIndex {
    pub fn new(cache: CacheSchema) -> Self { Self { cache } }

    pub fn register(&self, document: &Document) -> Result<()> {
        for token in document.distinct_tokens() {
            let mut ctx = self.cache.token_context(token)?;
            if ctx.document_ids.insert(document.id) {
                self.cache.put_token_context(token, &ctx)?;
            }
        }
        Ok(())
    }

    pub fn unregister(&self, document: &Document) -> Result<()> {
        for token in document.distinct_tokens() {
            let mut ctx = self.cache.token_context(token)?;
            if ctx.document_ids.remove(&document.id) {
                self.cache.put_token_context(token, &ctx)?;
            }
        }
        Ok(())
    }

    /// Documents sharing at least one token with `document`, excluding itself.
    pub fn related_documents(&self, document: &Document) -> Result<BTreeSet<DocId>> {
        let mut related = BTreeSet::new();
        for token in document.distinct_tokens() {
            related.extend(self.cache.token_context(token)?.document_ids);
        }
        related.remove(&document.id);
        Ok(related)
    }

    pub fn document_frequency(&self, token: &str) -> Result<usize> {
        Ok(self.cache.token_context(token)?.document_frequency())
    }
}
