//! Prompt rendering for assembled chunks.
//!
//! The default form is `[document_id/chunk_id] text` per chunk, chunks
//! separated by a blank line. Templates use `{field}` placeholders with
//! `{{` / `}}` as literal braces; the fields are `document_id`, `chunk_id`,
//! `text`, `score`, `metadata` and `metadata.<key>`. An absent score
//! renders as `None`.

use std::collections::HashSet;
use std::str::FromStr;

use regex::Regex;
use serde_json::Value;

use crate::assemble::AssembledChunk;
use crate::{RagctxError, Result};

/// Separator placed between rendered chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Rendered in place of `{score}` for chunks without a score.
pub const MISSING_SCORE: &str = "None";

/// Turns one assembled chunk into prompt text.
pub trait ChunkRenderer {
    fn render_chunk(&self, chunk: &AssembledChunk) -> Result<String>;
}

impl<F> ChunkRenderer for F
where
    F: Fn(&AssembledChunk) -> Result<String>,
{
    fn render_chunk(&self, chunk: &AssembledChunk) -> Result<String> {
        self(chunk)
    }
}

/// `[document_id/chunk_id] text`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvenanceRenderer;

impl ChunkRenderer for ProvenanceRenderer {
    fn render_chunk(&self, chunk: &AssembledChunk) -> Result<String> {
        Ok(format!("[{}/{}] {}", chunk.document_id, chunk.chunk_id, chunk.text))
    }
}

/// Render every chunk and join the results with a blank line.
pub fn render(assembled: &[AssembledChunk], renderer: Option<&dyn ChunkRenderer>) -> Result<String> {
    let renderer = renderer.unwrap_or(&ProvenanceRenderer);
    let parts = assembled
        .iter()
        .map(|chunk| renderer.render_chunk(chunk))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(CHUNK_SEPARATOR))
}

/// Distinct source labels in first-seen order: `metadata["source"]` when it
/// is a string, otherwise the document id.
pub fn sources(assembled: &[AssembledChunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for chunk in assembled {
        let label = match chunk.metadata.get("source") {
            Some(Value::String(s)) => s.clone(),
            _ => chunk.document_id.clone(),
        };
        if seen.insert(label.clone()) {
            out.push(label);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    DocumentId,
    ChunkId,
    Text,
    Score,
    Metadata,
    MetadataKey(String),
}

impl FromStr for Field {
    type Err = RagctxError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "document_id" => Ok(Field::DocumentId),
            "chunk_id" => Ok(Field::ChunkId),
            "text" => Ok(Field::Text),
            "score" => Ok(Field::Score),
            "metadata" => Ok(Field::Metadata),
            _ => match name.strip_prefix("metadata.") {
                Some(key) if !key.is_empty() => Ok(Field::MetadataKey(key.to_string())),
                _ => Err(RagctxError::TemplateFieldMissing(name.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed `{field}` template.
///
/// Unknown field names fail at parse time; `{metadata.key}` for an absent
/// key fails at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let token = Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]")
            .map_err(|e| RagctxError::TemplateSyntax(e.to_string()))?;

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in token.captures_iter(template) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            literal.push_str(&template[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                "{" | "}" => {
                    return Err(RagctxError::TemplateSyntax(format!(
                        "unmatched '{}' at byte {}",
                        whole.as_str(),
                        whole.start()
                    )))
                }
                _ => {
                    let name = caps.get(1).map_or("", |m| m.as_str()).trim();
                    let field = name.parse::<Field>()?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
            }
        }

        literal.push_str(&template[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

impl ChunkRenderer for PromptTemplate {
    fn render_chunk(&self, chunk: &AssembledChunk) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::DocumentId) => out.push_str(&chunk.document_id),
                Segment::Field(Field::ChunkId) => out.push_str(&chunk.chunk_id),
                Segment::Field(Field::Text) => out.push_str(&chunk.text),
                Segment::Field(Field::Score) => match chunk.score {
                    Some(score) => out.push_str(&score.to_string()),
                    None => out.push_str(MISSING_SCORE),
                },
                Segment::Field(Field::Metadata) => {
                    out.push_str(&serde_json::to_string(&chunk.metadata)?)
                }
                Segment::Field(Field::MetadataKey(key)) => match chunk.metadata.get(key) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {
                        return Err(RagctxError::TemplateFieldMissing(format!("metadata.{}", key)))
                    }
                },
            }
        }
        Ok(out)
    }
}
