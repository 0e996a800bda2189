//! Context assembly: folding per-document search hits into an ordered,
//! capped, token-bounded chunk sequence with provenance.

mod budget;
mod context;

pub use budget::{assemble, AssemblyLimits};
pub use context::{DocumentChunks, RetrievedContext};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chunk returned by vector search. Read-only to assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub document_id: String,
    pub chunk_id: String,
    pub text: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A chunk selected for the prompt. `(document_id, chunk_id)` identifies the
/// `RetrievedChunk` it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledChunk {
    pub document_id: String,
    pub chunk_id: String,
    pub text: String,
    pub score: Option<f32>,
    pub metadata: Map<String, Value>,
}

impl From<&RetrievedChunk> for AssembledChunk {
    fn from(chunk: &RetrievedChunk) -> Self {
        Self {
            document_id: chunk.document_id.clone(),
            chunk_id: chunk.chunk_id.clone(),
            text: chunk.text.clone(),
            score: chunk.score,
            metadata: chunk.metadata.clone(),
        }
    }
}

/// Decides whether a chunk may enter the context.
pub trait ChunkPredicate {
    fn accept(&self, chunk: &RetrievedChunk) -> bool;
}

impl<F> ChunkPredicate for F
where
    F: Fn(&RetrievedChunk) -> bool,
{
    fn accept(&self, chunk: &RetrievedChunk) -> bool {
        self(chunk)
    }
}

/// Keeps chunks scoring at least the threshold. Chunks without a score
/// (e.g. fetched for expanded documents) are kept.
#[derive(Debug, Clone, Copy)]
pub struct MinScore(pub f32);

impl ChunkPredicate for MinScore {
    fn accept(&self, chunk: &RetrievedChunk) -> bool {
        chunk.score.map_or(true, |s| s >= self.0)
    }
}

/// Token cost of a piece of text.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Counts whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
