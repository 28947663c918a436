//! Error type shared by every operation of the rule tree.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RtError>;

#[derive(Debug, Error)]
pub enum RtError {
    /// The schema handed to `configure()` is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `ingest()` or `learn()` called before `configure()`.
    #[error("model is not configured, call configure() first")]
    NotConfigured,

    /// A row does not carry one value per configured column.
    #[error("expecting {expected} elements instead found: {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// A value that must be numeric is not.
    #[error("column `{column}` expects a numeric value, found: {found}")]
    InvalidValue { column: String, found: String },

    #[error("insufficient data: at least {required} rows are needed to learn, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("input must be an object, instead found: {0}")]
    InvalidInput(String),

    /// Prediction needs a column the input does not carry.
    #[error("missing value for column `{0}`")]
    MissingColumn(String),

    /// `predict()`, `summary()` or `export_json()` called before a tree exists.
    #[error("no rule tree available, call learn() or import_json() first")]
    NotTrained,

    #[error("undefined or empty model encountered, import failed")]
    InvalidModel,

    #[error("JSON parsing error during import: {0}")]
    ParseError(#[source] serde_json::Error),

    #[error("incorrect model format or version: expected `{expected}`, found {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("invalid number of folds: {folds} for {rows} rows")]
    InvalidFolds { folds: usize, rows: usize },

    /// Serialising the tree failed.
    #[error("SerdeJson error: {0}")]
    SerdeJson(#[source] serde_json::Error),
}

impl From<serde_json::Error> for RtError {
    fn from(err: serde_json::Error) -> RtError {
        RtError::SerdeJson(err)
    }
}
