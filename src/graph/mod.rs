//! Document relationship graph: the accessor seam, its SQLite and in-memory
//! implementations, and deterministic one-hop expansion of seed documents.

mod expansion;
mod store;

pub use expansion::{expand_one_hop, expand_one_hop_db, expand_one_hop_with_sink};
pub use store::{
    create_document_node, create_document_relationship, delete_document_node,
    get_document_node, InMemoryRelationshipStore, NewDocumentNode,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// A logical document as stored in `document_nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub document_id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub doc_type: String,
}

/// Directed edge between two documents (from --relation_type--> to).
///
/// At most one edge exists per `(from, to, relation_type)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRelationship {
    pub from_document_id: String,
    pub to_document_id: String,
    pub relation_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DocumentRelationship {
    pub fn new(from: &str, to: &str, relation_type: &str) -> Self {
        Self {
            from_document_id: from.to_string(),
            to_document_id: to.to_string(),
            relation_type: relation_type.to_string(),
            metadata: Map::new(),
        }
    }

    fn same_triple(&self, other: &DocumentRelationship) -> bool {
        self.from_document_id == other.from_document_id
            && self.to_document_id == other.to_document_id
            && self.relation_type == other.relation_type
    }
}

/// Read-only query over stored relationships.
///
/// `outgoing` selects edges whose source is `document_id`, `incoming` edges
/// whose target is `document_id`. Both flags select the union; neither
/// selects nothing. An `Err` means the answer is unknown, which callers must
/// not confuse with "no relationships".
pub trait RelationshipStore {
    fn list_relationships_for_document(
        &self,
        document_id: &str,
        outgoing: bool,
        incoming: bool,
    ) -> Result<Vec<DocumentRelationship>>;
}

impl<T: RelationshipStore + ?Sized> RelationshipStore for &T {
    fn list_relationships_for_document(
        &self,
        document_id: &str,
        outgoing: bool,
        incoming: bool,
    ) -> Result<Vec<DocumentRelationship>> {
        (**self).list_relationships_for_document(document_id, outgoing, incoming)
    }
}
