//! Conversion between table collections and container files.
//!
//! - [`encode`] / [`write_collection_to_file`] - collection to file
//! - [`decode`] / [`read_file_to_collection`] - file to collection
//!
//! On disk every table is a group named after its key with a single
//! dataset [`DATASET_NAME`] inside.

mod decode;
mod encode;
mod table;

pub use decode::decode;
pub use encode::{chunk_dims, encode};
pub use table::{check_rectangular, flatten, table_shape, unflatten, Table, TableCollection};

/// Name of the dataset holding a table's values inside its group.
pub const DATASET_NAME: &str = "data";

/// Largest chunk edge used for table datasets.
pub const MAX_CHUNK_EDGE: u64 = 3;

/// Lowest accepted deflate level.
pub const MIN_COMPRESSION_LEVEL: u32 = 1;

/// Highest accepted deflate level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Alias of [`encode`].
pub fn write_collection_to_file(
    collection: &TableCollection,
    compression_level: u32,
    path: impl AsRef<std::path::Path>,
) -> crate::util::Result<()> {
    encode(collection, compression_level, path)
}

/// Alias of [`decode`].
pub fn read_file_to_collection(path: impl AsRef<std::path::Path>) -> crate::util::Result<TableCollection> {
    decode(path)
}
