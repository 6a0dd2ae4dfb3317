//! Typed view over the key-value cache. Each key prefix carries exactly one value shape:
//!
//! | key                              | value                    |
//! |----------------------------------|--------------------------|
//! | `tfidf:token:{token}`            | [`TokenContext`]         |
//! | `tfidf:document:{id}:{token}`    | `f64` weight             |
//! | `articles:{id}`                  | `Vec<SimilarityResult>`  |
//!
//! Values are bincode-encoded. Entries that fail to decode are logged and read as absent.

use crate::store::KeyValueStore;
use crate::{DocId, Result, SimilarityResult, TokenContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Prefix shared by every similarity-model key (token contexts and weights).
pub const MODEL_PREFIX: &str = "tfidf:";
pub const RESULTS_PREFIX: &str = "articles:";

pub fn token_key(token: &str) -> String { format!("tfidf:token:{token}") }

pub fn weight_key(id: DocId, token: &str) -> String { format!("tfidf:document:{id}:{token}") }

pub fn results_key(id: DocId) -> String { format!("{RESULTS_PREFIX}{id}") }

#[derive(Clone)]
pub struct CacheSchema {
    store: Arc<dyn KeyValueStore>,
}

impl CacheSchema {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> { &self.store }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key)? else { return Ok(None) };
        match bincode::deserialize(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(err) => {
                tracing::warn!(key, %err, "malformed cache entry, treating as absent");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.store.set(key, bytes)
    }

    pub fn token_context(&self, token: &str) -> Result<TokenContext> {
        Ok(self.read(&token_key(token))?.unwrap_or_default())
    }

    /// Empty contexts are dropped rather than stored.
    pub fn put_token_context(&self, token: &str, ctx: &TokenContext) -> Result<()> {
        if ctx.document_ids.is_empty() {
            self.store.remove(&token_key(token))
        } else {
            self.write(&token_key(token), ctx)
        }
    }

    pub fn weight(&self, id: DocId, token: &str) -> Result<Option<f64>> {
        self.read(&weight_key(id, token))
    }

    pub fn put_weight(&self, id: DocId, token: &str, weight: f64) -> Result<()> {
        self.write(&weight_key(id, token), &weight)
    }

    pub fn remove_weight(&self, id: DocId, token: &str) -> Result<()> {
        self.store.remove(&weight_key(id, token))
    }

    pub fn results(&self, id: DocId) -> Result<Option<Vec<SimilarityResult>>> {
        self.read(&results_key(id))
    }

    pub fn put_results(&self, id: DocId, results: &[SimilarityResult]) -> Result<()> {
        self.write(&results_key(id), &results)
    }

    pub fn remove_results(&self, id: DocId) -> Result<()> {
        self.store.remove(&results_key(id))
    }

    /// Ids of every document with a cached result list.
    pub fn cached_result_ids(&self) -> Result<Vec<DocId>> {
        let ids = self
            .store
            .scan_prefix(RESULTS_PREFIX)?
            .into_iter()
            .filter_map(|(key, _)| key[RESULTS_PREFIX.len()..].parse().ok())
            .collect();
        Ok(ids)
    }

    pub fn purge_model(&self) -> Result<()> { self.store.remove_prefix(MODEL_PREFIX) }

    pub fn purge_results(&self) -> Result<()> { self.store.remove_prefix(RESULTS_PREFIX) }
}
