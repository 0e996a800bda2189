//! Retrieval plan: the immutable record of seeds, one-hop expansion and the
//! constraints under which the expansion was produced.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

/// One followed edge, as reported in `expansion_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionEdge {
    pub from_document_id: String,
    pub to_document_id: String,
    pub relation_type: String,
}

/// Seeds plus the documents reached from them.
///
/// Constructed once per query and never mutated. `expanded_document_ids`
/// is sorted and disjoint from `seed_document_ids`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalPlan {
    seed_document_ids: Vec<String>,
    expanded_document_ids: Vec<String>,
    expansion_metadata: Vec<ExpansionEdge>,
    constraints: BTreeMap<String, Value>,
}

impl RetrievalPlan {
    /// Plan for a query that skips graph expansion.
    pub fn seeds_only(seed_document_ids: Vec<String>) -> Self {
        Self {
            seed_document_ids,
            expanded_document_ids: Vec::new(),
            expansion_metadata: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    /// Used by the planner; `expanded_document_ids` must already exclude seeds.
    pub(crate) fn expanded(
        seed_document_ids: Vec<String>,
        expanded_document_ids: Vec<String>,
        expansion_metadata: Vec<ExpansionEdge>,
        constraints: BTreeMap<String, Value>,
    ) -> Self {
        debug_assert!(expanded_document_ids
            .iter()
            .all(|id| !seed_document_ids.contains(id)));
        Self {
            seed_document_ids,
            expanded_document_ids,
            expansion_metadata,
            constraints,
        }
    }

    pub fn seed_document_ids(&self) -> &[String] {
        &self.seed_document_ids
    }

    pub fn expanded_document_ids(&self) -> &[String] {
        &self.expanded_document_ids
    }

    pub fn expansion_metadata(&self) -> &[ExpansionEdge] {
        &self.expansion_metadata
    }

    pub fn constraints(&self) -> &BTreeMap<String, Value> {
        &self.constraints
    }

    /// Default visiting order for assembly: seeds in caller order (first
    /// occurrence wins), then expanded documents.
    pub fn document_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.seed_document_ids
            .iter()
            .chain(self.expanded_document_ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}
