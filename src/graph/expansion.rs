//! Deterministic one-hop expansion of seed documents over outgoing edges.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use crate::db::Db;
use crate::events::{EventSink, LogSink, RetrievalEvent};
use crate::graph::RelationshipStore;
use crate::plan::{ExpansionEdge, RetrievalPlan};
use crate::{RagctxError, Result};

/// Expand seeds by one hop of outgoing relationships, logging decisions.
pub fn expand_one_hop<S>(store: &S, seed_document_ids: &[String]) -> Result<RetrievalPlan>
where
    S: RelationshipStore + ?Sized,
{
    expand_one_hop_with_sink(store, seed_document_ids, &LogSink)
}

/// Expand seeds by one hop of outgoing relationships.
///
/// Seeds are visited in sorted order whatever order the caller gave, and
/// each seed's edges are sorted by target id, so the plan is identical for
/// identical graph contents. Targets that are themselves seeds are dropped.
/// Any accessor failure aborts the whole plan.
pub fn expand_one_hop_with_sink<S>(
    store: &S,
    seed_document_ids: &[String],
    sink: &dyn EventSink,
) -> Result<RetrievalPlan>
where
    S: RelationshipStore + ?Sized,
{
    let seeds: BTreeSet<&str> = seed_document_ids.iter().map(String::as_str).collect();
    let mut expanded: BTreeSet<String> = BTreeSet::new();
    let mut expansion_metadata = Vec::new();

    for seed in &seeds {
        let mut edges = store
            .list_relationships_for_document(seed, true, false)
            .map_err(|e| match e {
                e @ RagctxError::LookupFailure { .. } => e,
                other => RagctxError::lookup(seed, other),
            })?;

        if let Some(stray) = edges.iter().find(|e| e.from_document_id != *seed) {
            return Err(RagctxError::lookup(
                seed,
                format!(
                    "accessor returned edge from {} when asked for outgoing edges",
                    stray.from_document_id
                ),
            ));
        }

        edges.sort_by(|a, b| {
            a.to_document_id
                .cmp(&b.to_document_id)
                .then_with(|| a.relation_type.cmp(&b.relation_type))
        });
        sink.record(&RetrievalEvent::SeedExpanded {
            seed: seed.to_string(),
            edges: edges.len(),
        });

        for edge in edges {
            expanded.insert(edge.to_document_id.clone());
            expansion_metadata.push(ExpansionEdge {
                from_document_id: edge.from_document_id,
                to_document_id: edge.to_document_id,
                relation_type: edge.relation_type,
            });
        }
    }

    for seed in &seeds {
        if expanded.remove(*seed) {
            sink.record(&RetrievalEvent::SeedTargetExcluded {
                document_id: seed.to_string(),
            });
        }
    }

    let mut constraints = BTreeMap::new();
    constraints.insert("depth".to_string(), json!(1));
    constraints.insert("traversal".to_string(), json!("outgoing"));

    sink.record(&RetrievalEvent::PlanBuilt {
        seeds: seeds.len(),
        expanded: expanded.len(),
        edges: expansion_metadata.len(),
    });

    Ok(RetrievalPlan::expanded(
        seed_document_ids.to_vec(),
        expanded.into_iter().collect(),
        expansion_metadata,
        constraints,
    ))
}

/// One-hop expansion against the SQLite relationship table, run on the
/// blocking pool.
pub async fn expand_one_hop_db(db: &Db, seed_document_ids: Vec<String>) -> Result<RetrievalPlan> {
    db.with_connection(move |conn| expand_one_hop(&*conn, &seed_document_ids))
        .await
}
