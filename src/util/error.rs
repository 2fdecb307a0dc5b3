//! Error types for the motion-tables library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for container and codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid container file: expected table container magic bytes")]
    InvalidMagic,

    /// Unsupported file format version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    /// Writer was dropped before the file was finalized
    #[error("Container file was not finalized")]
    NotFinalized,

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Encoding was asked to write an empty collection
    #[error("Table collection is empty")]
    EmptyCollection,

    /// Deflate level outside the accepted range
    #[error("Compression level {0} is invalid, must be in [1, 9]")]
    InvalidCompressionLevel(u32),

    /// A table row does not match the width of the first row
    #[error("Table '{table}' is ragged: row {row} has {actual} values, expected {expected}")]
    RaggedTable {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Group or dataset name cannot be stored
    #[error("Invalid link name: {0:?}")]
    InvalidName(String),

    /// A link with this name already exists in the parent group
    #[error("Link already exists: {0}")]
    DuplicateName(String),

    /// Link not found by name
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// Link index out of bounds
    #[error("Link index {index} out of bounds (count: {count})")]
    LinkOutOfBounds { index: usize, count: usize },

    /// Link exists but is of the wrong kind
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Chunk shape is not valid for the dataspace
    #[error("Invalid chunk {chunk:?} for dataspace {dims:?}")]
    InvalidChunk { chunk: Vec<u64>, dims: Vec<u64> },

    /// A filter was requested on a dataset without chunked layout
    #[error("Compression requires a chunked layout")]
    CompressionWithoutChunking,

    /// Dataset is not two-dimensional
    #[error("Dataset has rank {0}, expected 2")]
    InvalidRank(usize),

    /// Element type code is not supported
    #[error("Unsupported datatype code: {0}")]
    UnsupportedDatatype(u8),

    /// Filter id is not supported
    #[error("Unsupported filter id: {0}")]
    UnsupportedFilter(u8),

    /// Buffer length does not match the dataspace
    #[error("Buffer holds {actual} values, dataspace needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Chunk payload could not be inflated
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// True for errors raised before anything touched the filesystem.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyCollection | Self::InvalidCompressionLevel(_) | Self::RaggedTable { .. }
        )
    }
}

/// Result type alias for motion-tables operations.
pub type Result<T> = std::result::Result<T, Error>;
