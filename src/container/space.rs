//! Dataspace: the shape of a dataset.

use smallvec::SmallVec;

/// Shape of an n-dimensional dataset.
///
/// Dimensions are stored slowest-varying first, so a table of `rows`
/// rows and `cols` columns is `[rows, cols]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataspace {
    dims: SmallVec<[u64; 4]>,
}

impl Dataspace {
    /// Create a simple dataspace from a slice of extents.
    pub fn simple(dims: &[u64]) -> Self {
        Self { dims: SmallVec::from_slice(dims) }
    }

    /// Create a 2D dataspace.
    pub fn d2(rows: u64, cols: u64) -> Self {
        Self { dims: smallvec::smallvec![rows, cols] }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Extent of a single dimension.
    pub fn dim(&self, index: usize) -> Option<u64> {
        self.dims.get(index).copied()
    }

    /// All extents.
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    /// Total number of elements (product of all extents).
    pub fn num_points(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Size in bytes of `elem`-byte elements, or `None` on overflow.
    pub fn num_bytes(&self, elem: usize) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(elem as u64, |acc, &d| acc.checked_mul(d))
    }
}

impl From<Vec<u64>> for Dataspace {
    fn from(v: Vec<u64>) -> Self {
        Self { dims: SmallVec::from_vec(v) }
    }
}

impl std::fmt::Display for Dataspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}

/// Number of chunks in the grid of `dims` tiled by `chunk`, or `None` on overflow.
///
/// Every chunk extent must be non-zero.
pub(crate) fn chunk_count(dims: &[u64], chunk: &[u64]) -> Option<u64> {
    dims.iter()
        .zip(chunk)
        .try_fold(1u64, |acc, (&d, &c)| acc.checked_mul(d.div_ceil(c)))
}

/// Iterate over the chunk grid of `dims` tiled by `chunk`, row-major.
///
/// Yields the origin (element coordinates) of every chunk. The grid size
/// must already be known to fit, see [`chunk_count`].
pub(crate) fn chunk_origins(dims: &[u64], chunk: &[u64]) -> Vec<SmallVec<[u64; 4]>> {
    let counts: SmallVec<[u64; 4]> = dims
        .iter()
        .zip(chunk)
        .map(|(&d, &c)| d.div_ceil(c))
        .collect();
    let total: u64 = counts.iter().product();

    let mut origins = Vec::with_capacity(total as usize);
    for mut linear in 0..total {
        let mut origin: SmallVec<[u64; 4]> = smallvec::smallvec![0; dims.len()];
        for axis in (0..dims.len()).rev() {
            origin[axis] = (linear % counts[axis]) * chunk[axis];
            linear /= counts[axis];
        }
        origins.push(origin);
    }
    origins
}

/// Row-major strides (in elements) for the given extents.
pub(crate) fn strides(dims: &[u64]) -> SmallVec<[u64; 4]> {
    let mut out: SmallVec<[u64; 4]> = smallvec::smallvec![1; dims.len()];
    for axis in (0..dims.len().saturating_sub(1)).rev() {
        out[axis] = out[axis + 1] * dims[axis + 1];
    }
    out
}
