//! Corpus-wide TF-IDF model with incremental add/remove.
//!
//! The engine owns the corpus (document map) behind a single `RwLock`: scoring takes
//! the read side, `init`/`add`/`remove` take the write side for the whole
//! "mutate frequencies, recompute affected vectors" sequence. Token contexts and
//! per-document weights live in the key-value store under the `tfidf:` prefix.

use crate::config::SimilarityConfig;
use crate::index::TokenFrequencyIndex;
use crate::schema::{CacheSchema, MODEL_PREFIX};
use crate::store::{KeyValueStore, MemoryStore};
use crate::tfidf::{self, TfIdfVector};
use crate::{DocId, Document, Error, Result, SimilarityResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Corpus {
    documents: BTreeMap<DocId, Document>,
    ready: bool,
}

pub struct SimilarityEngine {
    cache: CacheSchema,
    index: TokenFrequencyIndex,
    config: SimilarityConfig,
    corpus: RwLock<Corpus>,
}

impl SimilarityEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, config: SimilarityConfig) -> Self {
        let cache = CacheSchema::new(store);
        let index = TokenFrequencyIndex::new(cache.clone());
        Self { cache, index, config, corpus: RwLock::new(Corpus::default()) }
    }

    pub fn config(&self) -> &SimilarityConfig { &self.config }

    pub fn cache(&self) -> &CacheSchema { &self.cache }

    pub fn index(&self) -> &TokenFrequencyIndex { &self.index }

    pub fn is_ready(&self) -> bool { self.corpus.read().ready }

    pub fn corpus_size(&self) -> usize { self.corpus.read().documents.len() }

    pub fn contains(&self, id: DocId) -> bool { self.corpus.read().documents.contains_key(&id) }

    pub fn document(&self, id: DocId) -> Result<Document> {
        let corpus = self.read_ready()?;
        corpus.documents.get(&id).cloned().ok_or(Error::NotFound(id))
    }

    pub fn document_ids(&self) -> Vec<DocId> { self.corpus.read().documents.keys().copied().collect() }

    pub fn init(&self, documents: Vec<Document>) -> Result<()> {
        self.init_cancellable(documents, &AtomicBool::new(false))
    }

    /// Two-pass bulk load. Both passes run against a private staging store; readers
    /// keep seeing the previous corpus (or `NotInitialized`) until the staged model
    /// is published under the writer lock. Raising `cancel` during staging aborts
    /// with [`Error::Cancelled`] and leaves visible state untouched.
    pub fn init_cancellable(&self, documents: Vec<Document>, cancel: &AtomicBool) -> Result<()> {
        let documents: BTreeMap<DocId, Document> = documents.into_iter().map(|d| (d.id, d)).collect();
        let corpus_size = documents.len();
        tracing::info!(corpus_size, "initializing similarity index");

        let staging_store = Arc::new(MemoryStore::new());
        let staging = CacheSchema::new(staging_store.clone());
        let staging_index = TokenFrequencyIndex::new(staging.clone());

        // Pass 1: every document must be registered before any vector is computed,
        // otherwise early vectors see understated document frequencies.
        for doc in documents.values() {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            staging_index.register(doc)?;
        }
        // Pass 2
        for doc in documents.values() {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let vector = self.compute_with(&staging, &doc.tokens, corpus_size)?;
            store_vector(&staging, doc.id, &vector)?;
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let mut corpus = self.corpus.write();
        corpus.ready = false;
        self.cache.purge_model()?;
        for (key, value) in staging_store.scan_prefix(MODEL_PREFIX)? {
            self.cache.store().set(&key, value)?;
        }
        corpus.documents = documents;
        corpus.ready = true;
        tracing::info!(corpus_size, "similarity index ready");
        Ok(())
    }

    /// Index a new document and recompute the vectors it affects.
    ///
    /// Returns the related set as it was before the document was registered. An id
    /// that is already indexed is re-indexed, so replaying a creation is harmless.
    pub fn add(&self, document: Document) -> Result<BTreeSet<DocId>> {
        let mut corpus = self.corpus.write();
        if !corpus.ready {
            return Err(Error::NotInitialized);
        }
        if corpus.documents.contains_key(&document.id) {
            tracing::debug!(id = document.id, "document already indexed, re-indexing");
            self.remove_locked(&mut corpus, document.id)?;
        }

        let related = self.related_locked(&corpus, &document)?;
        self.index.register(&document)?;
        let id = document.id;
        corpus.documents.insert(id, document);

        let corpus_size = corpus.documents.len();
        for affected in related.iter().chain(std::iter::once(&id)) {
            if let Some(doc) = corpus.documents.get(affected) {
                self.refresh_vector(doc, corpus_size)?;
            }
        }
        tracing::info!(id, related = related.len(), corpus_size, "document added to similarity index");
        Ok(related)
    }

    /// Purge a document from the index and recompute the vectors of related documents.
    pub fn remove(&self, id: DocId) -> Result<BTreeSet<DocId>> {
        let mut corpus = self.corpus.write();
        if !corpus.ready {
            return Err(Error::NotInitialized);
        }
        let related = self.remove_locked(&mut corpus, id)?;
        tracing::info!(id, related = related.len(), corpus_size = corpus.documents.len(), "document removed from similarity index");
        Ok(related)
    }

    fn remove_locked(&self, corpus: &mut Corpus, id: DocId) -> Result<BTreeSet<DocId>> {
        let document = corpus.documents.get(&id).cloned().ok_or(Error::NotFound(id))?;
        let related = self.related_locked(corpus, &document)?;

        self.index.unregister(&document)?;
        for token in document.distinct_tokens() {
            self.cache.remove_weight(id, token)?;
        }
        corpus.documents.remove(&id);

        let corpus_size = corpus.documents.len();
        for affected in &related {
            if let Some(doc) = corpus.documents.get(affected) {
                self.refresh_vector(doc, corpus_size)?;
            }
        }
        Ok(related)
    }

    fn related_locked(&self, corpus: &Corpus, document: &Document) -> Result<BTreeSet<DocId>> {
        let mut related = self.index.related_documents(document)?;
        // Contexts can outlive a crash mid-removal; only indexed documents count.
        related.retain(|id| corpus.documents.contains_key(id));
        Ok(related)
    }

    fn refresh_vector(&self, document: &Document, corpus_size: usize) -> Result<()> {
        let vector = self.compute_with(&self.cache, &document.tokens, corpus_size)?;
        tracing::debug!(id = document.id, terms = vector.len(), "recomputed tf-idf vector");
        store_vector(&self.cache, document.id, &vector)
    }

    fn compute_with(&self, cache: &CacheSchema, tokens: &[String], corpus_size: usize) -> Result<TfIdfVector> {
        let mut frequencies: HashMap<&str, usize> = HashMap::new();
        for token in tokens {
            if !frequencies.contains_key(token.as_str()) {
                frequencies.insert(token, cache.token_context(token)?.document_frequency());
            }
        }
        Ok(tfidf::compute_vector(tokens, corpus_size, self.config.idf, |t| {
            frequencies.get(t).copied().unwrap_or(0)
        }))
    }

    fn cached_vector(&self, document: &Document) -> Result<TfIdfVector> {
        let mut vector = TfIdfVector::new();
        for token in document.distinct_tokens() {
            let weight = self.cache.weight(document.id, token)?.unwrap_or(0.0);
            vector.insert(token.to_string(), weight);
        }
        Ok(vector)
    }

    /// The cached vector of an indexed document.
    pub fn vector(&self, id: DocId) -> Result<TfIdfVector> {
        let corpus = self.read_ready()?;
        let document = corpus.documents.get(&id).ok_or(Error::NotFound(id))?;
        self.cached_vector(document)
    }

    /// Score `document` against every indexed document, itself included when indexed.
    ///
    /// An indexed document is scored through its cached vector, so its results agree
    /// with [`score`](Self::score) in both directions.
    pub fn score_all(&self, document: &Document) -> Result<Vec<SimilarityResult>> {
        let corpus = self.read_ready()?;
        let query = match corpus.documents.get(&document.id) {
            Some(indexed) if indexed.tokens == document.tokens => self.cached_vector(indexed)?,
            _ => self.compute_with(&self.cache, &document.tokens, corpus.documents.len())?,
        };
        self.score_vector(&corpus, &query)
    }

    /// Score a bare token sequence against every indexed document.
    pub fn score_tokens(&self, tokens: &[String]) -> Result<Vec<SimilarityResult>> {
        let corpus = self.read_ready()?;
        let query = self.compute_with(&self.cache, tokens, corpus.documents.len())?;
        self.score_vector(&corpus, &query)
    }

    fn score_vector(&self, corpus: &Corpus, query: &TfIdfVector) -> Result<Vec<SimilarityResult>> {
        let mut results = Vec::with_capacity(corpus.documents.len());
        for target in corpus.documents.values() {
            let score = tfidf::similarity(query, &self.cached_vector(target)?);
            results.push(SimilarityResult { document_id: target.id, score });
        }
        Ok(results)
    }

    /// Cosine of the two cached vectors. Vectors of documents untouched by a mutation
    /// keep their old weights, so both sides are read from the same place.
    pub fn score(&self, source_id: DocId, target_id: DocId) -> Result<SimilarityResult> {
        let corpus = self.read_ready()?;
        let source = corpus.documents.get(&source_id).ok_or(Error::NotFound(source_id))?;
        let target = corpus.documents.get(&target_id).ok_or(Error::NotFound(target_id))?;
        let score = tfidf::similarity(&self.cached_vector(source)?, &self.cached_vector(target)?);
        Ok(SimilarityResult { document_id: target_id, score })
    }

    fn read_ready(&self) -> Result<parking_lot::RwLockReadGuard<'_, Corpus>> {
        let corpus = self.corpus.read();
        if corpus.ready { Ok(corpus) } else { Err(Error::NotInitialized) }
    }
}

fn store_vector(cache: &CacheSchema, id: DocId, vector: &TfIdfVector) -> Result<()> {
    for (token, weight) in vector {
        cache.put_weight(id, token, *weight)?;
    }
    Ok(())
}
