use thiserror::Error;

/// Failures while mutating or persisting the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("A record with id {0:?} already exists.")]
    DuplicateId(String),
    #[error("No record id is left after sequence number {0}.")]
    IdsExhausted(u64),
    #[error("{0}")]
    Field(#[from] crate::FieldError),
}

/// Structural failures that abort an import before anything is added.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import failed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Import failed: Root must be an array.")]
    NotAnArray,
    #[error("Import failed: No valid records found.")]
    NoValidRecords { rejected: usize },
    #[error("Import failed: {0}")]
    Store(#[from] StoreError),
}
