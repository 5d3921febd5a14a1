use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    NoSuchDocument(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("WAL error: {0}")]
    WalError(String),
}
