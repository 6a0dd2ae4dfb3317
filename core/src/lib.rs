//! Incrementally maintained TF-IDF similarity index for near-duplicate detection.
//!
//! Documents are registered in a token frequency index, weighted with TF-IDF and
//! compared by cosine similarity. Adding or removing a document only recomputes the
//! vectors of documents sharing a token with it, and the cached per-document result
//! lists are patched in place rather than rebuilt.

pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod groups;
pub mod index;
pub mod persist;
pub mod repository;
pub mod schema;
pub mod service;
pub mod store;
pub mod tfidf;
pub mod tokenizer;

pub use config::{IdfMode, SimilarityConfig};
pub use duplicates::DuplicateResultCache;
pub use engine::SimilarityEngine;
pub use error::{Error, Result};
pub use groups::{DuplicateGroup, DuplicateGroupBuilder};
pub use index::{DocId, Document, SimilarityResult, TokenContext, TokenFrequencyIndex};
pub use repository::{DocumentRecord, DocumentRepository, MemoryRepository};
pub use service::{DocumentService, DocumentView};
pub use store::{KeyValueStore, MemoryStore};
pub use tfidf::TfIdfVector;
