use thiserror::Error;

/// Canonical result for colstream.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("could not open column store '{location}': {reason}")]
    Open { location: String, reason: String },

    #[error("column '{column}' does not exist in the store")]
    MissingColumn { column: String },

    #[error(
        "all mapped columns must have the same length: '{column}' has {found} rows, expected {expected}"
    )]
    SchemaMismatch {
        column: String,
        expected: u64,
        found: u64,
    },

    #[error("unsupported element type for column '{column}': {detail}")]
    UnsupportedType { column: String, detail: String },

    #[error("only 1-dimensional columns are supported; '{column}' is chunked in {dims} dimensions")]
    Dimensionality { column: String, dims: usize },

    #[error("column store handle is closed")]
    ClosedHandle,

    #[error("I/O error on column '{column}': {reason}")]
    Io { column: String, reason: String },

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// True for the errors that can only surface while binding the schema.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Open { .. }
                | Error::MissingColumn { .. }
                | Error::SchemaMismatch { .. }
                | Error::UnsupportedType { .. }
                | Error::Dimensionality { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
