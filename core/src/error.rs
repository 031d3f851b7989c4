use thiserror::Error;

#[derive(Debug, Error)]
pub enum TetherError {
    /// Missing or unusable configuration: no session key, unresolvable
    /// morph type, incomplete relation metadata
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Relation kind the deferred engine cannot resolve
    #[error("Unsupported relation: {0}")]
    UnsupportedRelation(String),

    /// Failure reported by the storage engine
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error mapping a row or value
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl TetherError {
    /// Returns true for failures raised by the storage engine rather than
    /// detected while composing a query.
    pub fn is_storage(&self) -> bool {
        match self {
            TetherError::Storage(_) => true,
            #[cfg(feature = "rusqlite")]
            TetherError::Rusqlite(_) => true,
            _ => false,
        }
    }
}

/// Result type for deferred binding operations
pub type Result<T> = std::result::Result<T, TetherError>;
