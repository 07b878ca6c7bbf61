use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a realign, merge, restore or generation run.
#[derive(Error, Debug)]
pub enum RealignError {
    #[error("tensor shape {actual:?} does not match the expected shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("element count {actual} does not match the expected count {expected}")]
    SizeMismatch { actual: usize, expected: usize },

    #[error("file {} does not exist", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{}:{line}: {value:?} is not a valid number", .path.display())]
    ParseError {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("index {index} is out of range for axis {axis} of length {len}")]
    IndexOutOfRange { index: i64, axis: usize, len: usize },

    #[error("array layout: {0}")]
    Layout(#[from] ndarray::ShapeError),

    #[error("invalid value distribution: {0}")]
    InvalidDistribution(String),

    #[error("manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("i/o on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RealignError {
    /// Attaches `path` to an I/O failure. A missing file gets its own variant,
    /// everything else stays `Io`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            RealignError::FileNotFound { path }
        } else {
            RealignError::Io { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, RealignError>;
