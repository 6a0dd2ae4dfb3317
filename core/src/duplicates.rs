//! Per-document similarity result lists under `articles:{id}`, kept reciprocal as
//! documents come and go.
//!
//! Every rewrite sequence (engine mutation plus result-list fix-ups) runs under one
//! writer mutex, so two mutations never interleave their read-append-store steps.
//! Each step is also idempotent, so a sequence interrupted by a crash can be replayed.

use crate::engine::SimilarityEngine;
use crate::schema::CacheSchema;
use crate::{DocId, Document, Result, SimilarityResult};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct DuplicateResultCache {
    engine: Arc<SimilarityEngine>,
    writer: Mutex<()>,
}

impl DuplicateResultCache {
    pub fn new(engine: Arc<SimilarityEngine>) -> Self {
        Self { engine, writer: Mutex::new(()) }
    }

    pub fn engine(&self) -> &Arc<SimilarityEngine> { &self.engine }

    fn cache(&self) -> &CacheSchema { self.engine.cache() }

    pub fn threshold(&self) -> f64 { self.engine.config().matching_threshold }

    /// Drop every cached result list.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.writer.lock();
        self.cache().purge_results()
    }

    /// Ids of the documents scoring at or above the threshold against `document`.
    ///
    /// Cached results are used when present. Otherwise they are computed and, when
    /// `persist` is set, stored unfiltered so a later threshold change can reuse them.
    pub fn find_duplicates(&self, document: &Document, persist: bool) -> Result<Vec<DocId>> {
        if let Some(results) = self.cache().results(document.id)? {
            return Ok(self.filter(document.id, &results));
        }
        if !persist {
            let results = self.engine.score_all(document)?;
            return Ok(self.filter(document.id, &results));
        }

        let _guard = self.writer.lock();
        let results = match self.cache().results(document.id)? {
            Some(results) => results,
            None => {
                let results = self.engine.score_all(document)?;
                self.cache().put_results(document.id, &results)?;
                results
            }
        };
        Ok(self.filter(document.id, &results))
    }

    /// Duplicates of text that is not part of the corpus. Nothing is cached.
    pub fn check(&self, tokens: &[String]) -> Result<Vec<DocId>> {
        let threshold = self.threshold();
        Ok(self
            .engine
            .score_tokens(tokens)?
            .into_iter()
            .filter(|r| r.score >= threshold)
            .map(|r| r.document_id)
            .collect())
    }

    fn filter(&self, own_id: DocId, results: &[SimilarityResult]) -> Vec<DocId> {
        let threshold = self.threshold();
        results
            .iter()
            .filter(|r| r.document_id != own_id && r.score >= threshold)
            .map(|r| r.document_id)
            .collect()
    }

    pub fn on_document_created(&self, document: Document) -> Result<()> {
        let _guard = self.writer.lock();
        self.created_locked(document)
    }

    pub fn on_document_removed(&self, id: DocId) -> Result<()> {
        let _guard = self.writer.lock();
        self.removed_locked(id)
    }

    /// Removal of the old version followed by creation of the new one.
    pub fn on_document_updated(&self, old: &Document, new: Document) -> Result<()> {
        let _guard = self.writer.lock();
        self.removed_locked(old.id)?;
        self.created_locked(new)
    }

    fn created_locked(&self, document: Document) -> Result<()> {
        let id = document.id;
        self.engine.add(document.clone())?;
        let results = self.engine.score_all(&document)?;
        self.cache().put_results(id, &results)?;

        for result in results.iter().filter(|r| r.document_id != id) {
            let reciprocal = SimilarityResult { document_id: id, score: result.score };
            self.rewrite(result.document_id, |list| {
                list.retain(|r| r.document_id != id);
                list.push(reciprocal);
            })?;
        }
        tracing::debug!(id, peers = results.len().saturating_sub(1), "cached similarity results for new document");
        Ok(())
    }

    fn removed_locked(&self, id: DocId) -> Result<()> {
        self.engine.remove(id)?;
        let referenced: Vec<DocId> = match self.cache().results(id)? {
            Some(results) => results.iter().map(|r| r.document_id).filter(|other| *other != id).collect(),
            // Without our own list we cannot tell who references us; sweep everything.
            None => self.cache().cached_result_ids()?,
        };
        self.cache().remove_results(id)?;
        for other in referenced {
            self.rewrite(other, |list| list.retain(|r| r.document_id != id))?;
        }
        tracing::debug!(id, "dropped cached similarity results for removed document");
        Ok(())
    }

    /// Read-modify-write of one result list. Absent lists are left absent; they are
    /// computed in full the next time they are asked for.
    fn rewrite<F>(&self, id: DocId, update: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<SimilarityResult>),
    {
        let Some(mut list) = self.cache().results(id)? else { return Ok(()) };
        update(&mut list);
        self.cache().put_results(id, &list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimilarityConfig;
    use crate::store::MemoryStore;

    fn doc(id: DocId, tokens: &[&str]) -> Document {
        Document::new(id, tokens.join(" "), tokens.iter().map(|t| t.to_string()).collect())
    }

    fn setup(threshold: f64, docs: Vec<Document>) -> DuplicateResultCache {
        let config = SimilarityConfig::default().with_threshold(threshold);
        let engine = Arc::new(SimilarityEngine::new(Arc::new(MemoryStore::new()), config));
        engine.init(docs).unwrap();
        DuplicateResultCache::new(engine)
    }

    fn ids_in(list: &[SimilarityResult]) -> Vec<DocId> {
        let mut ids: Vec<DocId> = list.iter().map(|r| r.document_id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn persist_flag_controls_caching() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"]), doc(2, &["dog", "cat"]), doc(3, &["fish"])]);
        let d1 = dup.engine().document(1).unwrap();
        assert_eq!(dup.find_duplicates(&d1, false).unwrap(), vec![2]);
        assert!(dup.engine().cache().results(1).unwrap().is_none());
        assert_eq!(dup.find_duplicates(&d1, true).unwrap(), vec![2]);
        let cached = dup.engine().cache().results(1).unwrap().unwrap();
        // raw scores are cached, including self and below-threshold entries
        assert_eq!(ids_in(&cached), vec![1, 2, 3]);
    }

    #[test]
    fn creation_appends_reciprocal_entries() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"]), doc(2, &["fish"])]);
        for id in [1, 2] {
            let d = dup.engine().document(id).unwrap();
            dup.find_duplicates(&d, true).unwrap();
        }
        dup.on_document_created(doc(3, &["dog", "cat"])).unwrap();

        let own = dup.engine().cache().results(3).unwrap().unwrap();
        assert_eq!(ids_in(&own), vec![1, 2, 3]);
        let list1 = dup.engine().cache().results(1).unwrap().unwrap();
        assert_eq!(ids_in(&list1), vec![1, 2, 3]);
        let to_three = list1.iter().find(|r| r.document_id == 3).unwrap();
        let from_three = own.iter().find(|r| r.document_id == 1).unwrap();
        assert_eq!(to_three.score, from_three.score);
        assert_eq!(dup.find_duplicates(&dup.engine().document(1).unwrap(), true).unwrap(), vec![3]);
    }

    #[test]
    fn replayed_creation_does_not_duplicate_entries() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"])]);
        dup.find_duplicates(&dup.engine().document(1).unwrap(), true).unwrap();
        dup.on_document_created(doc(2, &["dog", "bird"])).unwrap();
        dup.on_document_created(doc(2, &["dog", "bird"])).unwrap();
        let list1 = dup.engine().cache().results(1).unwrap().unwrap();
        assert_eq!(ids_in(&list1), vec![1, 2]);
    }

    #[test]
    fn removal_purges_own_and_referencing_entries() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"]), doc(2, &["dog", "cat"]), doc(3, &["fish"])]);
        for id in [1, 2, 3] {
            dup.find_duplicates(&dup.engine().document(id).unwrap(), true).unwrap();
        }
        dup.on_document_removed(2).unwrap();
        assert!(dup.engine().cache().results(2).unwrap().is_none());
        assert_eq!(ids_in(&dup.engine().cache().results(1).unwrap().unwrap()), vec![1, 3]);
        assert_eq!(ids_in(&dup.engine().cache().results(3).unwrap().unwrap()), vec![1, 3]);
        assert!(!dup.engine().contains(2));
    }

    #[test]
    fn removal_without_own_list_sweeps_all_lists() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"])]);
        dup.find_duplicates(&dup.engine().document(1).unwrap(), true).unwrap();
        dup.on_document_created(doc(2, &["dog", "cat"])).unwrap();
        dup.engine().cache().remove_results(2).unwrap();
        dup.on_document_removed(2).unwrap();
        assert_eq!(ids_in(&dup.engine().cache().results(1).unwrap().unwrap()), vec![1]);
    }

    #[test]
    fn update_is_remove_then_create() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"]), doc(2, &["fish", "bird"]), doc(3, &["sun"])]);
        for id in [1, 2, 3] {
            dup.find_duplicates(&dup.engine().document(id).unwrap(), true).unwrap();
        }
        let old = dup.engine().document(2).unwrap();
        dup.on_document_updated(&old, doc(2, &["dog", "cat"])).unwrap();
        assert_eq!(dup.find_duplicates(&dup.engine().document(2).unwrap(), true).unwrap(), vec![1]);
        assert_eq!(dup.find_duplicates(&dup.engine().document(1).unwrap(), true).unwrap(), vec![2]);
        assert_eq!(dup.engine().index().document_frequency("fish").unwrap(), 0);
    }

    #[test]
    fn check_does_not_persist() {
        let dup = setup(0.5, vec![doc(1, &["dog", "cat"]), doc(2, &["fish"])]);
        let tokens = vec!["dog".to_string(), "cat".to_string()];
        assert_eq!(dup.check(&tokens).unwrap(), vec![1]);
        assert!(dup.engine().cache().cached_result_ids().unwrap().is_empty());
    }
}
