//! In-memory table types and row-major (un)flattening.

use std::collections::BTreeMap;

use crate::util::{Error, Result};

/// One rectangular table: a sequence of equally long rows.
pub type Table = Vec<Vec<f32>>;

/// Named set of tables, keyed by group name.
pub type TableCollection = BTreeMap<String, Table>;

/// Row and column count of a table, or `None` if it has nothing to store.
///
/// The column count comes from the first row.
pub fn table_shape(table: &Table) -> Option<(usize, usize)> {
    let cols = table.first()?.len();
    if cols == 0 {
        return None;
    }
    Some((table.len(), cols))
}

/// Check that every row has the width of the first one.
pub fn check_rectangular(name: &str, table: &Table) -> Result<()> {
    let Some((_, cols)) = table_shape(table) else {
        return Ok(());
    };
    match table.iter().enumerate().find(|(_, row)| row.len() != cols) {
        Some((row, values)) => Err(Error::RaggedTable {
            table: name.to_string(),
            row,
            expected: cols,
            actual: values.len(),
        }),
        None => Ok(()),
    }
}

/// Concatenate rows into one contiguous buffer.
pub fn flatten(table: &Table) -> Vec<f32> {
    let len = table_shape(table).map_or(0, |(rows, cols)| rows * cols);
    let mut out = Vec::with_capacity(len);
    for row in table {
        out.extend_from_slice(row);
    }
    out
}

/// Split a row-major buffer back into `rows` rows of `cols` values.
pub fn unflatten(buffer: &[f32], rows: usize, cols: usize) -> Result<Table> {
    let expected = rows
        .checked_mul(cols)
        .ok_or_else(|| Error::invalid(format!("table shape {}x{} overflows", rows, cols)))?;
    if buffer.len() != expected {
        return Err(Error::BufferSizeMismatch { expected, actual: buffer.len() });
    }
    if cols == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(buffer.chunks_exact(cols).map(<[f32]>::to_vec).collect())
}
