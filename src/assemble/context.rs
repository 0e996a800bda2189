//! Insertion-ordered mapping from document id to its retrieved chunks.

use std::collections::HashMap;

use super::RetrievedChunk;
use crate::{RagctxError, Result};

/// One document's chunks, in per-document rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunks {
    pub document_id: String,
    pub chunks: Vec<RetrievedChunk>,
}

/// Search hits grouped by document. Documents keep the order in which they
/// were first seen; chunks keep the order in which they were added.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    documents: Vec<DocumentChunks>,
    index: HashMap<String, usize>,
}

impl RetrievedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a globally ranked hit list by document.
    pub fn from_ranked<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = RetrievedChunk>,
    {
        let mut context = Self::new();
        for chunk in chunks {
            context.push(chunk);
        }
        context
    }

    /// Append a chunk to its document, registering the document if new.
    pub fn push(&mut self, chunk: RetrievedChunk) {
        let slot = self.slot(&chunk.document_id);
        self.documents[slot].chunks.push(chunk);
    }

    /// Append chunks to `document_id`. Every chunk must belong to it.
    pub fn extend_document(
        &mut self,
        document_id: &str,
        chunks: Vec<RetrievedChunk>,
    ) -> Result<()> {
        if let Some(stray) = chunks.iter().find(|c| c.document_id != document_id) {
            return Err(RagctxError::InvalidInput(format!(
                "chunk {} belongs to {}, not {}",
                stray.chunk_id, stray.document_id, document_id
            )));
        }
        let slot = self.slot(document_id);
        self.documents[slot].chunks.extend(chunks);
        Ok(())
    }

    fn slot(&mut self, document_id: &str) -> usize {
        if let Some(&slot) = self.index.get(document_id) {
            return slot;
        }
        let slot = self.documents.len();
        self.documents.push(DocumentChunks {
            document_id: document_id.to_string(),
            chunks: Vec::new(),
        });
        self.index.insert(document_id.to_string(), slot);
        slot
    }

    pub fn get(&self, document_id: &str) -> Option<&DocumentChunks> {
        self.index.get(document_id).map(|&slot| &self.documents[slot])
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.index.contains_key(document_id)
    }

    pub fn documents(&self) -> &[DocumentChunks] {
        &self.documents
    }

    /// Document ids in first-seen order; the seed list for planning.
    pub fn document_ids(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.document_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }
}

impl FromIterator<RetrievedChunk> for RetrievedContext {
    fn from_iter<I: IntoIterator<Item = RetrievedChunk>>(iter: I) -> Self {
        Self::from_ranked(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn chunk(doc: &str, id: &str) -> RetrievedChunk {
        RetrievedChunk {
            document_id: doc.to_string(),
            chunk_id: id.to_string(),
            text: format!("text of {}", id),
            score: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_from_ranked_groups_in_first_seen_order() {
        let context = RetrievedContext::from_ranked(vec![
            chunk("b", "b1"),
            chunk("a", "a1"),
            chunk("b", "b2"),
        ]);
        assert_eq!(context.document_ids(), vec!["b", "a"]);
        let b: Vec<_> = context.get("b").unwrap().chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(b, vec!["b1", "b2"]);
        assert_eq!(context.total_chunks(), 3);
    }

    #[test]
    fn test_extend_document_rejects_foreign_chunks() {
        let mut context = RetrievedContext::new();
        let err = context.extend_document("a", vec![chunk("b", "b1")]);
        assert!(matches!(err, Err(RagctxError::InvalidInput(_))));
        assert!(context.is_empty());

        context.extend_document("a", vec![chunk("a", "a1")]).unwrap();
        assert!(context.contains("a"));
    }

    #[test]
    fn test_empty_extend_registers_document() {
        let mut context = RetrievedContext::new();
        context.extend_document("a", Vec::new()).unwrap();
        assert_eq!(context.len(), 1);
        assert_eq!(context.total_chunks(), 0);
    }
}
