use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the review loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The schema definition or CSV file is absent or unreadable.
    #[error("{kind} not found at {}", path.display())]
    MissingResource { kind: &'static str, path: PathBuf },
    /// The CSV file itself cannot be read or decoded.
    #[error("failed to read csv at {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// A value cannot be converted to its target column type.
    #[error("row {row}: cannot parse {column} value {value:?}: {reason}")]
    TypeCoercion {
        row: usize,
        column: &'static str,
        value: String,
        reason: String,
    },
    /// The store rejected a statement or the transaction failed to commit.
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
