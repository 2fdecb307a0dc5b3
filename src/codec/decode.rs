//! Container file -> table collection.

use std::path::Path;

use tracing::{debug, error, info};

use super::table::{unflatten, Table, TableCollection};
use super::DATASET_NAME;
use crate::container::{ContainerFile, Group};
use crate::util::{Error, Result};

/// Read every top-level group of `path` back into a table collection.
///
/// Groups are visited in storage order (byte-wise ascending names). Each
/// must hold a rank-2 dataset named [`DATASET_NAME`]; a group that does not
/// fails the whole decode and no partial collection is returned.
pub fn decode(path: impl AsRef<Path>) -> Result<TableCollection> {
    decode_path(path.as_ref())
}

#[tracing::instrument(level = "debug")]
fn decode_path(path: &Path) -> Result<TableCollection> {
    let file = ContainerFile::open(path)
        .inspect_err(|e| error!(file = %path.display(), error = %e, "failed to open container file"))?;

    let root = file.root();
    let mut out = TableCollection::new();
    for index in 0..root.num_links() {
        let name = root.link_name(index)?;
        let table = read_table(root, name)
            .inspect_err(|e| error!(file = %path.display(), group = %name, error = %e, "failed to read group"))?;
        debug!(group = %name, rows = table.len(), "table read");

        if out.insert(name.to_string(), table).is_some() {
            debug!(group = %name, "duplicate group name, keeping the last one");
        }
    }

    info!(file = %path.display(), tables = out.len(), "read table container");
    Ok(out)
}

fn read_table(root: &Group, name: &str) -> Result<Table> {
    let group = root.open_group(name)?;
    let dataset = group.open_dataset(DATASET_NAME)?;

    let space = dataset.space();
    if space.rank() != 2 {
        return Err(Error::InvalidRank(space.rank()));
    }
    let rows = to_usize(space.dims()[0])?;
    let cols = to_usize(space.dims()[1])?;

    let buffer = dataset.read_f32()?;
    unflatten(&buffer, rows, cols)
}

fn to_usize(extent: u64) -> Result<usize> {
    usize::try_from(extent).map_err(|_| Error::invalid(format!("extent {} does not fit in memory", extent)))
}
