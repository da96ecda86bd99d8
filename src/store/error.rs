use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to read a client file into a [`super::ClientStore`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file format: {}. Use csv, tsv, txt, xlsx, xlsm, xlsb, xls or ods", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("{} has no header row", .0.display())]
    MissingHeader(PathBuf),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A rejected add or edit. The store is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("client ID ({column}) is required")]
    MissingClientId { column: String },

    #[error("client ID {id} already exists")]
    DuplicateClientId { id: String },

    #[error("column name must not be empty")]
    EmptyColumnName,
}

/// Edit or lookup of a row index that is not in the record set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no record with index {0}")]
pub struct NotFoundError(pub usize);

/// Failure to write the record set.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot save as .{0}; save as .xlsx, .csv or .tsv instead")]
    UnsupportedFormat(String),

    #[error("failed to encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },

    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any store failure, for callers that handle them uniformly.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Edit failures: either the index is unknown or a new column name is invalid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<EditError> for StoreError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::NotFound(e) => StoreError::NotFound(e),
            EditError::Validation(e) => StoreError::Validation(e),
        }
    }
}
