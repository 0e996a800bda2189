//! Agent prompt pipeline: assembly limits, optional filter and token
//! counter, and rendering bundled for reuse across queries.

use std::sync::Arc;

use crate::assemble::{
    assemble, AssembledChunk, AssemblyLimits, ChunkPredicate, RetrievedContext, TokenCounter,
};
use crate::events::{EventSink, LogSink};
use crate::plan::RetrievalPlan;
use crate::prompt::{self, ChunkRenderer};
use crate::Result;

type SharedCounter = Arc<dyn TokenCounter + Send + Sync>;
type SharedFilter = Arc<dyn ChunkPredicate + Send + Sync>;

/// Feeds retrieved chunks into an LLM prompt with deterministic ordering,
/// caps, an optional token budget and provenance tags.
///
/// Holds no per-query state; one pipeline can serve concurrent queries.
#[derive(Clone)]
pub struct AgentPromptPipeline {
    limits: AssemblyLimits,
    token_counter: Option<SharedCounter>,
    filter: Option<SharedFilter>,
    sink: Arc<dyn EventSink>,
}

impl AgentPromptPipeline {
    pub fn new(limits: AssemblyLimits) -> Self {
        Self {
            limits,
            token_counter: None,
            filter: None,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_token_counter<C>(mut self, counter: C) -> Self
    where
        C: TokenCounter + Send + Sync + 'static,
    {
        self.token_counter = Some(Arc::new(counter));
        self
    }

    pub fn with_filter<P>(mut self, filter: P) -> Self
    where
        P: ChunkPredicate + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn limits(&self) -> &AssemblyLimits {
        &self.limits
    }

    /// Structured, agent-ready chunk list.
    pub fn build_prompt_input(
        &self,
        retrieved: &RetrievedContext,
        document_order: &[String],
    ) -> Vec<AssembledChunk> {
        let counter = self
            .token_counter
            .as_deref()
            .map(|c| c as &dyn TokenCounter);
        let filter = self.filter.as_deref().map(|f| f as &dyn ChunkPredicate);
        let chunks = assemble(
            retrieved,
            document_order,
            &self.limits,
            counter,
            filter,
            self.sink.as_ref(),
        );
        log::debug!("Agent prompt input prepared with {} chunks", chunks.len());
        chunks
    }

    /// Assembly ordered by the plan: seeds, then expanded documents.
    pub fn build_from_plan(
        &self,
        retrieved: &RetrievedContext,
        plan: &RetrievalPlan,
    ) -> Vec<AssembledChunk> {
        self.build_prompt_input(retrieved, &plan.document_order())
    }

    /// Single prompt string; `renderer` defaults to the provenance form.
    pub fn build_prompt_text(
        &self,
        retrieved: &RetrievedContext,
        document_order: &[String],
        renderer: Option<&dyn ChunkRenderer>,
    ) -> Result<String> {
        let chunks = self.build_prompt_input(retrieved, document_order);
        prompt::render(&chunks, renderer)
    }
}

impl Default for AgentPromptPipeline {
    fn default() -> Self {
        Self::new(AssemblyLimits::default())
    }
}

impl std::fmt::Debug for AgentPromptPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentPromptPipeline")
            .field("limits", &self.limits)
            .field("token_counter", &self.token_counter.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
