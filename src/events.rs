//! Structured events emitted by the planner and the assembler.
//!
//! Callers inject an [`EventSink`]; [`LogSink`] forwards to the `log` facade.

use std::sync::Mutex;

/// Something the planner or assembler decided while building a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalEvent {
    /// Outgoing edges fetched for one seed.
    SeedExpanded { seed: String, edges: usize },
    /// A relationship pointed back at a seed and was dropped from the expansion.
    SeedTargetExcluded { document_id: String },
    /// One-hop plan finished.
    PlanBuilt { seeds: usize, expanded: usize, edges: usize },
    /// Document not named in `document_order`, visited after the ordered ones.
    DocumentAppended { document_id: String },
    /// Chunk rejected by the filter predicate.
    ChunkFiltered { document_id: String, chunk_id: String },
    /// Per-document cap reached; remaining chunks of the document skipped.
    DocumentCapReached { document_id: String, kept: usize },
    /// Global chunk cap reached; assembly stopped.
    TotalChunksReached { limit: usize },
    /// Chunk would overflow the token budget; assembly stopped.
    TokenBudgetReached {
        document_id: String,
        chunk_id: String,
        cost: usize,
        used: usize,
        limit: usize,
    },
    /// Assembly finished.
    Assembled { chunks: usize, tokens: usize },
}

/// Receiver of [`RetrievalEvent`]s. Must not fail or block for long.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &RetrievalEvent);
}

/// Forwards events to `log::debug!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: &RetrievalEvent) {
        match event {
            RetrievalEvent::SeedExpanded { seed, edges } => {
                log::debug!("Expansion: seed {} has {} outgoing edges", seed, edges)
            }
            RetrievalEvent::SeedTargetExcluded { document_id } => {
                log::debug!("Expansion: {} is a seed, excluded from expanded set", document_id)
            }
            RetrievalEvent::PlanBuilt { seeds, expanded, edges } => log::debug!(
                "Expansion: plan built (seeds={}, expanded={}, edges={})",
                seeds,
                expanded,
                edges
            ),
            RetrievalEvent::DocumentAppended { document_id } => {
                log::debug!("Assembly: {} not in document order, appended", document_id)
            }
            RetrievalEvent::ChunkFiltered { document_id, chunk_id } => {
                log::debug!("Assembly: filtered out {}/{}", document_id, chunk_id)
            }
            RetrievalEvent::DocumentCapReached { document_id, kept } => {
                log::debug!("Assembly: per-document cap reached for {} ({} kept)", document_id, kept)
            }
            RetrievalEvent::TotalChunksReached { limit } => {
                log::debug!("Assembly: total chunk cap {} reached", limit)
            }
            RetrievalEvent::TokenBudgetReached {
                document_id,
                chunk_id,
                cost,
                used,
                limit,
            } => log::debug!(
                "Assembly: {}/{} costs {} tokens, {} of {} used; stopping",
                document_id,
                chunk_id,
                cost,
                used,
                limit
            ),
            RetrievalEvent::Assembled { chunks, tokens } => {
                log::debug!("Assembly: {} chunks, {} tokens", chunks, tokens)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &RetrievalEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RetrievalEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RetrievalEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &RetrievalEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
