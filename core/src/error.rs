use crate::types::{DocumentId, SubjectId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelixError {
    /// The extraction boundary could not produce usable fields.
    /// Fatal for that document only; recorded on the document row.
    #[error("extraction failed for document {document_id}: {reason}")]
    Extraction {
        document_id: DocumentId,
        reason: String,
    },

    #[error("document '{0}' not found")]
    DocumentNotFound(DocumentId),

    #[error("subject '{0}' has no documents on file")]
    SubjectNotFound(SubjectId),

    #[error("no risk profile recorded for subject '{0}'")]
    ProfileNotFound(SubjectId),

    #[error("unsupported document kind: {0}")]
    UnsupportedDocumentKind(String),

    #[error("invalid feature vector: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HelixError {
    /// Only store failures are worth retrying; validation, extraction
    /// and lookup errors are deterministic and will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HelixError::Persistence(_))
    }
}

pub type HelixResult<T> = Result<T, HelixError>;
