//! Relationship accessors and the write helpers used to populate the graph.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{DocumentNode, DocumentRelationship, RelationshipStore};
use crate::{RagctxError, Result};

impl RelationshipStore for Connection {
    fn list_relationships_for_document(
        &self,
        document_id: &str,
        outgoing: bool,
        incoming: bool,
    ) -> Result<Vec<DocumentRelationship>> {
        if !outgoing && !incoming {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .prepare(
                "SELECT from_document_id, to_document_id, relation_type, metadata \
                 FROM document_relationships \
                 WHERE (?2 AND from_document_id = ?1) OR (?3 AND to_document_id = ?1) \
                 ORDER BY id",
            )
            .map_err(|e| RagctxError::lookup(document_id, e))?;
        let rows = stmt
            .query_map(params![document_id, outgoing, incoming], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| RagctxError::lookup(document_id, e))?;

        let mut out = Vec::new();
        for row in rows {
            let (from_document_id, to_document_id, relation_type, metadata) =
                row.map_err(|e| RagctxError::lookup(document_id, e))?;
            out.push(DocumentRelationship {
                from_document_id,
                to_document_id,
                relation_type,
                metadata: parse_metadata(document_id, &metadata)?,
            });
        }
        Ok(out)
    }
}

fn parse_metadata(document_id: &str, raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RagctxError::lookup(
            document_id,
            format!("relationship metadata is not an object: {}", other),
        )),
        Err(e) => Err(RagctxError::lookup(
            document_id,
            format!("malformed relationship metadata: {}", e),
        )),
    }
}

/// Accessor over an in-process edge list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelationshipStore {
    edges: Vec<DocumentRelationship>,
}

impl InMemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge. A second edge with the same `(from, to, relation_type)`
    /// is rejected.
    pub fn insert(&mut self, relationship: DocumentRelationship) -> Result<()> {
        if self.edges.iter().any(|e| e.same_triple(&relationship)) {
            return Err(RagctxError::InvalidInput(format!(
                "relationship already exists: {} -[{}]-> {}",
                relationship.from_document_id,
                relationship.relation_type,
                relationship.to_document_id
            )));
        }
        self.edges.push(relationship);
        Ok(())
    }
}

impl RelationshipStore for InMemoryRelationshipStore {
    fn list_relationships_for_document(
        &self,
        document_id: &str,
        outgoing: bool,
        incoming: bool,
    ) -> Result<Vec<DocumentRelationship>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| {
                (outgoing && e.from_document_id == document_id)
                    || (incoming && e.to_document_id == document_id)
            })
            .cloned()
            .collect())
    }
}

/// Fields for a new `document_nodes` row. A v4 UUID is generated when
/// `document_id` is `None`.
#[derive(Debug, Clone, Default)]
pub struct NewDocumentNode {
    pub document_id: Option<String>,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub doc_type: String,
}

/// Insert a document node and return its id.
pub fn create_document_node(conn: &Connection, node: NewDocumentNode) -> Result<String> {
    let document_id = node
        .document_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO document_nodes (document_id, title, summary, source, doc_type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![document_id, node.title, node.summary, node.source, node.doc_type],
    )?;
    log::debug!("Created document node {}", document_id);
    Ok(document_id)
}

pub fn get_document_node(conn: &Connection, document_id: &str) -> Result<Option<DocumentNode>> {
    let node = conn
        .query_row(
            "SELECT document_id, title, summary, source, doc_type \
             FROM document_nodes WHERE document_id = ?1",
            [document_id],
            |row| {
                Ok(DocumentNode {
                    document_id: row.get(0)?,
                    title: row.get(1)?,
                    summary: row.get(2)?,
                    source: row.get(3)?,
                    doc_type: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(node)
}

/// Delete a document node; its relationships and chunks go with it.
/// Returns whether a row was removed.
pub fn delete_document_node(conn: &Connection, document_id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM document_nodes WHERE document_id = ?1",
        [document_id],
    )?;
    Ok(removed > 0)
}

/// Insert a relationship between two existing documents.
pub fn create_document_relationship(
    conn: &Connection,
    from_document_id: &str,
    to_document_id: &str,
    relation_type: &str,
    metadata: Option<Map<String, Value>>,
) -> Result<DocumentRelationship> {
    for id in [from_document_id, to_document_id] {
        if get_document_node(conn, id)?.is_none() {
            return Err(RagctxError::DocumentNotFound(id.to_string()));
        }
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM document_relationships \
         WHERE from_document_id = ?1 AND to_document_id = ?2 AND relation_type = ?3)",
        params![from_document_id, to_document_id, relation_type],
        |row| row.get(0),
    )?;
    if exists {
        return Err(RagctxError::InvalidInput(format!(
            "relationship already exists: {} -[{}]-> {}",
            from_document_id, relation_type, to_document_id
        )));
    }

    let metadata = metadata.unwrap_or_default();
    let metadata_json = serde_json::to_string(&metadata)?;
    conn.execute(
        "INSERT INTO document_relationships \
         (from_document_id, to_document_id, relation_type, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            from_document_id,
            to_document_id,
            relation_type,
            metadata_json,
            Utc::now().to_rfc3339()
        ],
    )?;

    Ok(DocumentRelationship {
        from_document_id: from_document_id.to_string(),
        to_document_id: to_document_id.to_string(),
        relation_type: relation_type.to_string(),
        metadata,
    })
}
