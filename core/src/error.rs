use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("checkpoint (de)serialization failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("failed to parse record data: {details} (at line ~{line})")]
    Parse { line: usize, details: String },

    #[error("in {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("calculation file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("reference file {0} contains no molecules")]
    EmptyReference(String),

    #[error("table shapes are inconsistent: {0}")]
    ShapeMismatch(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn parse(line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            line,
            details: details.into(),
        }
    }

    pub fn shape(details: impl Into<String>) -> Self {
        Self::ShapeMismatch(details.into())
    }

    /// Attach the path of the file that was being read when this error occurred.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
