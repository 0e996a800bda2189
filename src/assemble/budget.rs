//! Chunk budgeting: per-document caps, a global cap and a token ceiling.

use std::collections::HashSet;

use serde::Deserialize;

use super::{
    AssembledChunk, ChunkPredicate, DocumentChunks, RetrievedContext, TokenCounter,
    WhitespaceTokenCounter,
};
use crate::events::{EventSink, RetrievalEvent};

/// Bounds applied while assembling a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AssemblyLimits {
    #[serde(default = "default_max_chunks_per_doc")]
    pub max_chunks_per_doc: usize,
    #[serde(default = "default_max_total_chunks")]
    pub max_total_chunks: usize,
    /// Hard ceiling on summed token cost; `None` disables token accounting.
    #[serde(default)]
    pub max_total_tokens: Option<usize>,
}

fn default_max_chunks_per_doc() -> usize {
    5
}

fn default_max_total_chunks() -> usize {
    50
}

impl Default for AssemblyLimits {
    fn default() -> Self {
        Self {
            max_chunks_per_doc: default_max_chunks_per_doc(),
            max_total_chunks: default_max_total_chunks(),
            max_total_tokens: None,
        }
    }
}

/// Fold per-document chunks into one ordered, bounded sequence.
///
/// Documents are visited in `document_order`, then any remaining documents
/// in the context's own order. Within a document the given chunk order is
/// kept. A chunk rejected by `filter` costs nothing. Each document yields at
/// most `max_chunks_per_doc` accepted chunks, and assembly stops outright
/// once `max_total_chunks` are accepted.
///
/// With a token budget, the first chunk whose cost would take the running
/// total past `max_total_tokens` is dropped and ends assembly, even if later
/// chunks would fit. `token_counter` defaults to [`WhitespaceTokenCounter`].
pub fn assemble(
    context: &RetrievedContext,
    document_order: &[String],
    limits: &AssemblyLimits,
    token_counter: Option<&dyn TokenCounter>,
    filter: Option<&dyn ChunkPredicate>,
    sink: &dyn EventSink,
) -> Vec<AssembledChunk> {
    let counter = token_counter.unwrap_or(&WhitespaceTokenCounter);
    let mut assembled = Vec::new();
    let mut used_tokens = 0usize;

    'documents: for document in visiting_order(context, document_order, sink) {
        let mut kept = 0usize;

        for chunk in &document.chunks {
            if assembled.len() >= limits.max_total_chunks {
                sink.record(&RetrievalEvent::TotalChunksReached {
                    limit: limits.max_total_chunks,
                });
                break 'documents;
            }
            if kept >= limits.max_chunks_per_doc {
                sink.record(&RetrievalEvent::DocumentCapReached {
                    document_id: document.document_id.clone(),
                    kept,
                });
                break;
            }
            if let Some(filter) = filter {
                if !filter.accept(chunk) {
                    sink.record(&RetrievalEvent::ChunkFiltered {
                        document_id: chunk.document_id.clone(),
                        chunk_id: chunk.chunk_id.clone(),
                    });
                    continue;
                }
            }
            if let Some(limit) = limits.max_total_tokens {
                let cost = counter.count(&chunk.text);
                let over_budget = used_tokens.checked_add(cost).map_or(true, |t| t > limit);
                if over_budget {
                    sink.record(&RetrievalEvent::TokenBudgetReached {
                        document_id: chunk.document_id.clone(),
                        chunk_id: chunk.chunk_id.clone(),
                        cost,
                        used: used_tokens,
                        limit,
                    });
                    break 'documents;
                }
                used_tokens += cost;
            }

            assembled.push(AssembledChunk::from(chunk));
            kept += 1;
        }
    }

    sink.record(&RetrievalEvent::Assembled {
        chunks: assembled.len(),
        tokens: used_tokens,
    });
    assembled
}

fn visiting_order<'c>(
    context: &'c RetrievedContext,
    document_order: &[String],
    sink: &dyn EventSink,
) -> Vec<&'c DocumentChunks> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut visit = Vec::with_capacity(context.len());

    for id in document_order {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(document) = context.get(id) {
            visit.push(document);
        }
    }

    for document in context.documents() {
        if !seen.contains(document.document_id.as_str()) {
            sink.record(&RetrievalEvent::DocumentAppended {
                document_id: document.document_id.clone(),
            });
            visit.push(document);
        }
    }

    visit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{MinScore, RetrievedChunk};
    use crate::events::{NoopSink, RecordingSink};
    use serde_json::Map;

    fn chunk(doc: &str, id: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            document_id: doc.to_string(),
            chunk_id: id.to_string(),
            text: text.to_string(),
            score: None,
            metadata: Map::new(),
        }
    }

    fn doc_with(doc: &str, n: usize) -> Vec<RetrievedChunk> {
        (0..n)
            .map(|i| chunk(doc, &format!("{}{}", doc, i), &format!("chunk {} of {}", i, doc)))
            .collect()
    }

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn chunk_ids(chunks: &[AssembledChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.chunk_id.as_str()).collect()
    }

    fn limits(per_doc: usize, total: usize, tokens: Option<usize>) -> AssemblyLimits {
        AssemblyLimits {
            max_chunks_per_doc: per_doc,
            max_total_chunks: total,
            max_total_tokens: tokens,
        }
    }

    #[test]
    fn test_per_document_cap_takes_front() {
        let context = RetrievedContext::from_ranked(doc_with("a", 10));
        let out = assemble(&context, &order(&["a"]), &limits(3, 50, None), None, None, &NoopSink);
        assert_eq!(chunk_ids(&out), vec!["a0", "a1", "a2"]);
    }

    #[test]
    fn test_global_cap_spans_documents_in_order() {
        let mut context = RetrievedContext::new();
        context.extend_document("a", doc_with("a", 5)).unwrap();
        context.extend_document("b", doc_with("b", 5)).unwrap();

        let out = assemble(&context, &order(&["b", "a"]), &limits(5, 6, None), None, None, &NoopSink);
        assert_eq!(out.len(), 6);
        assert_eq!(chunk_ids(&out), vec!["b0", "b1", "b2", "b3", "b4", "a0"]);
    }

    #[test]
    fn test_token_budget_hard_stop() {
        let context = RetrievedContext::from_ranked(vec![
            chunk("a", "c1", "one two three"),
            chunk("a", "c2", "one two three four"),
            chunk("a", "c3", "1 2 3 4 5 6 7 8 9 10"),
            chunk("a", "c4", "one two"),
        ]);
        let sink = RecordingSink::new();
        let out = assemble(&context, &order(&["a"]), &limits(10, 10, Some(8)), None, None, &sink);

        assert_eq!(chunk_ids(&out), vec!["c1", "c2"]);
        assert!(sink.events().contains(&RetrievalEvent::TokenBudgetReached {
            document_id: "a".to_string(),
            chunk_id: "c3".to_string(),
            cost: 10,
            used: 7,
            limit: 8,
        }));
    }

    #[test]
    fn test_token_budget_stops_across_documents() {
        let mut context = RetrievedContext::new();
        context.extend_document("a", vec![chunk("a", "a1", "w w w w w")]).unwrap();
        context.extend_document("b", vec![chunk("b", "b1", "w w w w w w")]).unwrap();
        context.extend_document("c", vec![chunk("c", "c1", "w")]).unwrap();

        let out = assemble(&context, &order(&["a", "b", "c"]), &limits(5, 50, Some(10)), None, None, &NoopSink);
        assert_eq!(chunk_ids(&out), vec!["a1"]);
    }

    #[test]
    fn test_huge_token_cost_halts_without_overflow() {
        let context = RetrievedContext::from_ranked(vec![
            chunk("a", "c1", "small"),
            chunk("a", "c2", "HUGE"),
            chunk("a", "c3", "small"),
        ]);
        let counter = |t: &str| if t == "HUGE" { usize::MAX } else { 3 };
        let sink = RecordingSink::new();
        let out = assemble(&context, &[], &limits(5, 50, Some(8)), Some(&counter), None, &sink);

        assert_eq!(chunk_ids(&out), vec!["c1"]);
        assert!(sink.events().contains(&RetrievalEvent::Assembled { chunks: 1, tokens: 3 }));
    }

    #[test]
    fn test_budget_exactly_reached_is_allowed() {
        let context = RetrievedContext::from_ranked(vec![chunk("a", "c1", "a b"), chunk("a", "c2", "c d")]);
        let out = assemble(&context, &[], &limits(5, 50, Some(4)), None, None, &NoopSink);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_custom_token_counter() {
        let context = RetrievedContext::from_ranked(vec![chunk("a", "c1", "abcd"), chunk("a", "c2", "ef")]);
        let chars = |t: &str| t.chars().count();
        let out = assemble(&context, &[], &limits(5, 50, Some(5)), Some(&chars), None, &NoopSink);
        assert_eq!(chunk_ids(&out), vec!["c1"]);
    }

    #[test]
    fn test_filter_does_not_count_against_caps() {
        let mut chunks = doc_with("a", 6);
        for (i, c) in chunks.iter_mut().enumerate() {
            c.score = Some(if i % 2 == 0 { 0.9 } else { 0.1 });
        }
        let context = RetrievedContext::from_ranked(chunks);
        let filter = MinScore(0.5);
        let out = assemble(&context, &[], &limits(2, 50, None), None, Some(&filter), &NoopSink);
        assert_eq!(chunk_ids(&out), vec!["a0", "a2"]);
    }

    #[test]
    fn test_filtered_chunks_cost_no_tokens() {
        let context = RetrievedContext::from_ranked(vec![
            chunk("a", "big", "w w w w w w w w w w"),
            chunk("a", "small", "w w"),
        ]);
        let skip_big = |c: &RetrievedChunk| c.chunk_id != "big";
        let out = assemble(&context, &[], &limits(5, 50, Some(3)), None, Some(&skip_big), &NoopSink);
        assert_eq!(chunk_ids(&out), vec!["small"]);
    }

    #[test]
    fn test_unordered_documents_appended() {
        let mut context = RetrievedContext::new();
        context.extend_document("x", doc_with("x", 1)).unwrap();
        context.extend_document("y", doc_with("y", 1)).unwrap();
        context.extend_document("z", doc_with("z", 1)).unwrap();

        let sink = RecordingSink::new();
        let out = assemble(&context, &order(&["z", "missing", "z"]), &limits(5, 50, None), None, None, &sink);
        assert_eq!(chunk_ids(&out), vec!["z0", "x0", "y0"]);
        let appended = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, RetrievalEvent::DocumentAppended { .. }))
            .count();
        assert_eq!(appended, 2);
    }

    #[test]
    fn test_empty_input() {
        let out = assemble(&RetrievedContext::new(), &order(&["a"]), &AssemblyLimits::default(), None, None, &NoopSink);
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_total_cap_yields_nothing() {
        let context = RetrievedContext::from_ranked(doc_with("a", 3));
        let out = assemble(&context, &[], &limits(5, 0, None), None, None, &NoopSink);
        assert!(out.is_empty());
    }

    #[test]
    fn test_provenance_traces_to_single_input() {
        let mut context = RetrievedContext::new();
        context.extend_document("a", doc_with("a", 4)).unwrap();
        context.extend_document("b", doc_with("b", 4)).unwrap();
        let out = assemble(&context, &order(&["a", "b"]), &limits(3, 5, None), None, None, &NoopSink);

        for assembled in &out {
            let sources: Vec<_> = context
                .documents()
                .iter()
                .flat_map(|d| d.chunks.iter())
                .filter(|c| c.document_id == assembled.document_id && c.chunk_id == assembled.chunk_id)
                .collect();
            assert_eq!(sources.len(), 1);
            assert_eq!(sources[0].text, assembled.text);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut context = RetrievedContext::new();
        context.extend_document("a", doc_with("a", 4)).unwrap();
        context.extend_document("b", doc_with("b", 4)).unwrap();
        let l = limits(2, 3, Some(100));
        let first = assemble(&context, &order(&["b"]), &l, None, None, &NoopSink);
        let second = assemble(&context, &order(&["b"]), &l, None, None, &NoopSink);
        assert_eq!(first, second);
    }
}
