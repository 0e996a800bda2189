pub mod config;
pub mod error;
pub mod db;
pub mod events;
pub mod graph;
pub mod plan;
pub mod assemble;
pub mod chunks;
pub mod prompt;
pub mod pipeline;

pub use config::Config;
pub use error::{RagctxError, Result};
pub use assemble::{assemble, AssembledChunk, AssemblyLimits, RetrievedChunk, RetrievedContext};
pub use graph::{expand_one_hop, DocumentRelationship, RelationshipStore};
pub use pipeline::AgentPromptPipeline;
pub use plan::{ExpansionEdge, RetrievalPlan};
pub use prompt::{render, ChunkRenderer, PromptTemplate};
