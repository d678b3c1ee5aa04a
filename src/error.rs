use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Encryption error: {0}")]
    Encryption(String),
    /// Deliberately detail-free: the cause is only traced at debug level.
    #[error("Decryption failed")]
    Decryption,
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Commit error: {0}")]
    CommitError(String),
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl PaymentError {
    /// The `error_code` reported to the gateway when this error ends a delivery.
    pub fn ack_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "1",
            Self::InvalidPayload(_) | Self::MalformedEnvelope(_) => "99",
            _ => "2",
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
