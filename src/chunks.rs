//! Stored chunk lookup for documents that entered a plan through expansion.
//!
//! Expanded documents have no search hits of their own, so their leading
//! chunks (by `chunk_index`) are loaded from `vector_chunks` instead.

use rusqlite::{params, Connection};
use serde_json::{Map, Value};

use crate::assemble::{RetrievedChunk, RetrievedContext};
use crate::plan::RetrievalPlan;
use crate::{RagctxError, Result};

/// Load up to `per_document_limit` chunks for each id, documents in the
/// given order. Returned chunks carry no score.
pub fn fetch_document_chunks(
    conn: &Connection,
    document_ids: &[String],
    per_document_limit: usize,
) -> Result<Vec<RetrievedChunk>> {
    let mut stmt = conn.prepare(
        "SELECT chunk_id, chunk_text, source_metadata FROM vector_chunks \
         WHERE document_id = ?1 ORDER BY chunk_index LIMIT ?2",
    )?;
    let limit = i64::try_from(per_document_limit).unwrap_or(i64::MAX);

    let mut out = Vec::new();
    for document_id in document_ids {
        let rows = stmt.query_map(params![document_id, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (chunk_id, text, raw_metadata) = row?;
            out.push(RetrievedChunk {
                document_id: document_id.clone(),
                chunk_id,
                text,
                score: None,
                metadata: parse_source_metadata(&raw_metadata)?,
            });
        }
    }
    Ok(out)
}

fn parse_source_metadata(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(RagctxError::InvalidInput(format!(
            "source_metadata is not an object: {}",
            other
        ))),
    }
}

/// Add stored chunks for every expanded document not already in `context`.
/// Returns how many chunks were added.
pub fn backfill_expanded(
    conn: &Connection,
    plan: &RetrievalPlan,
    context: &mut RetrievedContext,
    per_document_limit: usize,
) -> Result<usize> {
    let missing: Vec<String> = plan
        .expanded_document_ids()
        .iter()
        .filter(|id| !context.contains(id))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    let chunks = fetch_document_chunks(conn, &missing, per_document_limit)?;
    let added = chunks.len();
    for chunk in chunks {
        context.push(chunk);
    }
    log::debug!(
        "Backfilled {} chunks for {} expanded documents",
        added,
        missing.len()
    );
    Ok(added)
}

/// Store one chunk of a document.
pub fn insert_chunk(
    conn: &Connection,
    document_id: &str,
    chunk_id: &str,
    chunk_index: i64,
    text: &str,
    source_metadata: &Map<String, Value>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO vector_chunks (document_id, chunk_id, chunk_index, chunk_text, source_metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            document_id,
            chunk_id,
            chunk_index,
            text,
            serde_json::to_string(source_metadata)?
        ],
    )?;
    Ok(())
}
