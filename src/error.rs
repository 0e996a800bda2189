use thiserror::Error;

/// Main error type for ragctx
#[derive(Error, Debug)]
pub enum RagctxError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Relationship accessor could not answer for a document.
    /// Fatal to the planning call; never turned into an empty expansion.
    #[error("Relationship lookup failed for document {document_id}: {reason}")]
    LookupFailure {
        document_id: String,
        reason: String,
    },

    /// Template placeholder names a field the chunk does not have
    #[error("Template field missing: {0}")]
    TemplateFieldMissing(String),

    /// Template text could not be parsed
    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RagctxError {
    /// Wrap any accessor-side failure as a lookup failure for `document_id`.
    pub fn lookup(document_id: &str, reason: impl std::fmt::Display) -> Self {
        RagctxError::LookupFailure {
            document_id: document_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenient Result type using RagctxError
pub type Result<T> = std::result::Result<T, RagctxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagctxError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: RagctxError = rusqlite_err.into();
        assert!(matches!(err, RagctxError::Database(_)));
    }

    #[test]
    fn test_lookup_failure_names_document() {
        let err = RagctxError::lookup("doc-a", "store unavailable");
        let msg = err.to_string();
        assert!(msg.contains("doc-a"));
        assert!(msg.contains("store unavailable"));
    }

    #[test]
    fn test_template_field_missing_display() {
        let err = RagctxError::TemplateFieldMissing("title".to_string());
        assert_eq!(err.to_string(), "Template field missing: title");
    }
}
