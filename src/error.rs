use thiserror::Error;

/// Custom error type for loader operations.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Malformed line {line:?}: {details}")]
    MalformedLine { line: String, details: String },

    #[error("Invalid value {value:?} for field {field:?}: {source}")]
    InvalidFieldValue {
        field: String,
        value: String,
        source: std::num::ParseFloatError,
    },

    #[error("Invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Insert failed: {0}")]
    Insert(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    /// A pass-two lookup missed an ordinal that pass one must have registered.
    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement conversion from lock poison errors for convenience
impl<T> From<std::sync::PoisonError<T>> for LoadError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        LoadError::Lock(format!("Mutex/RwLock poisoned: {}", err))
    }
}
