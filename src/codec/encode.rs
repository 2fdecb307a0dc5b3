//! Table collection -> container file.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::table::{check_rectangular, flatten, table_shape, Table, TableCollection};
use super::{DATASET_NAME, MAX_CHUNK_EDGE, MAX_COMPRESSION_LEVEL, MIN_COMPRESSION_LEVEL};
use crate::container::{DatasetCreateProps, Dataspace, Datatype, FileWriter};
use crate::util::{Error, Result};

/// Write `collection` to `path`, one group per table.
///
/// Every table becomes a group named after its key, holding a chunked,
/// deflate-compressed `f32` dataset named [`DATASET_NAME`] of shape
/// `[rows, cols]`. Tables with no rows or an empty first row are skipped
/// with a warning.
///
/// The collection, the compression level and the shape of every table are
/// checked before the file is created. A failure after that point leaves an
/// unfinalized file at `path` which [`decode`](super::decode) refuses to open.
pub fn encode(collection: &TableCollection, compression_level: u32, path: impl AsRef<Path>) -> Result<()> {
    encode_path(collection, compression_level, path.as_ref())
}

#[tracing::instrument(level = "debug", skip(collection), fields(tables = collection.len()))]
fn encode_path(collection: &TableCollection, compression_level: u32, path: &Path) -> Result<()> {
    validate(collection, compression_level)
        .inspect_err(|e| error!(file = %path.display(), error = %e, "table collection rejected"))?;

    let mut file = FileWriter::create(path)
        .inspect_err(|e| error!(file = %path.display(), error = %e, "failed to create container file"))?;

    let mut written = 0usize;
    for (name, table) in collection {
        let Some((rows, cols)) = table_shape(table) else {
            warn!(table = %name, "empty table skipped");
            continue;
        };

        write_table(&mut file, name, table, rows, cols, compression_level).inspect_err(|e| {
            error!(file = %path.display(), table = %name, error = %e, "failed to write table")
        })?;
        debug!(table = %name, rows, cols, "table written");
        written += 1;
    }

    file.close()
        .inspect_err(|e| error!(file = %path.display(), error = %e, "failed to finalize container file"))?;

    info!(file = %path.display(), tables = written, level = compression_level, "wrote compressed table container");
    Ok(())
}

/// Checks that must pass before anything touches the filesystem.
fn validate(collection: &TableCollection, compression_level: u32) -> Result<()> {
    if collection.is_empty() {
        return Err(Error::EmptyCollection);
    }
    if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&compression_level) {
        return Err(Error::InvalidCompressionLevel(compression_level));
    }
    for (name, table) in collection {
        check_rectangular(name, table)?;
    }
    Ok(())
}

fn write_table(
    file: &mut FileWriter,
    name: &str,
    table: &Table,
    rows: usize,
    cols: usize,
    compression_level: u32,
) -> Result<()> {
    let mut group = file.create_group(name)?;
    let space = Dataspace::d2(rows as u64, cols as u64);

    let mut props = DatasetCreateProps::new();
    props
        .set_chunk(&chunk_dims(rows, cols))?
        .set_deflate(compression_level)?;

    let mut dataset = group.create_dataset(DATASET_NAME, Datatype::Float32, &space, &props)?;
    dataset.write_f32(&flatten(table))
}

/// Chunk shape for a `rows x cols` table.
///
/// Square chunks of edge `min(cols, MAX_CHUNK_EDGE)`; the row extent is
/// clamped to `rows` so that short tables still get a valid chunk.
pub fn chunk_dims(rows: usize, cols: usize) -> [u64; 2] {
    let edge = (cols as u64).min(MAX_CHUNK_EDGE);
    [edge.min(rows as u64), edge]
}
