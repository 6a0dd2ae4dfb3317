use crate::duplicates::DuplicateResultCache;
use crate::{DocId, Document, Result};
use std::collections::BTreeSet;

/// A document together with everything it matched, as an unordered id set.
pub type DuplicateGroup = BTreeSet<DocId>;

/// Builds duplicate groups from the cached per-document results.
///
/// Groups are deduplicated by exact set equality only. Overlapping groups are not
/// merged: a chain `a~b, b~c` with `a` and `c` dissimilar yields `{a,b}`, `{a,b,c}` and
/// `{b,c}` rather than one connected component.
pub struct DuplicateGroupBuilder<'a> {
    duplicates: &'a DuplicateResultCache,
}

impl<'a> DuplicateGroupBuilder<'a> {
    pub fn new(duplicates: &'a DuplicateResultCache) -> Self { Self { duplicates } }

    pub fn build_groups(&self, documents: &[Document]) -> Result<Vec<DuplicateGroup>> {
        let mut ordered: Vec<&Document> = documents.iter().collect();
        ordered.sort_by_key(|d| d.id);

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for document in ordered {
            let mut group: DuplicateGroup = self.duplicates.find_duplicates(document, true)?.into_iter().collect();
            group.insert(document.id);
            // size 1 is the document matching only itself
            if group.len() > 1 && !groups.contains(&group) {
                groups.push(group);
            }
        }
        tracing::debug!(documents = documents.len(), groups = groups.len(), "built duplicate groups");
        Ok(groups)
    }
}
