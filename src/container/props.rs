//! Dataset element types and creation properties.

use smallvec::SmallVec;

use super::space::Dataspace;
use crate::util::{Error, Result};

/// Element type of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Datatype {
    /// 32-bit IEEE 754 float, little-endian on disk
    Float32 = 1,
}

impl Datatype {
    /// Size of one element in bytes.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Float32 => 4,
        }
    }

    /// Decode from the on-disk tag.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Float32),
            other => Err(Error::UnsupportedDatatype(other)),
        }
    }

    /// On-disk tag.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float32 => write!(f, "float32"),
        }
    }
}

/// Filter applied to each chunk on write (and reversed on read).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// zlib/deflate at the given level (0-9)
    Deflate(u8),
}

impl Filter {
    /// On-disk filter id.
    pub const DEFLATE_ID: u8 = 1;

    /// On-disk id of this filter.
    pub const fn id(self) -> u8 {
        match self {
            Self::Deflate(_) => Self::DEFLATE_ID,
        }
    }

    /// Filter parameter stored next to the id.
    pub const fn param(self) -> u8 {
        match self {
            Self::Deflate(level) => level,
        }
    }

    /// Rebuild from id and parameter.
    pub fn from_parts(id: u8, param: u8) -> Result<Self> {
        match id {
            Self::DEFLATE_ID => Ok(Self::Deflate(param)),
            other => Err(Error::UnsupportedFilter(other)),
        }
    }
}

/// Storage layout of a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// One data block holding every element
    #[default]
    Contiguous,
    /// Row-major grid of equally-shaped chunks
    Chunked(SmallVec<[u64; 4]>),
}

/// Dataset creation property list.
///
/// Chunking has to be configured before any filter, filters are only
/// valid on chunked datasets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetCreateProps {
    layout: Layout,
    filters: Vec<Filter>,
}

impl DatasetCreateProps {
    /// Contiguous layout, no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to chunked layout with the given chunk extents.
    pub fn set_chunk(&mut self, chunk: &[u64]) -> Result<&mut Self> {
        if chunk.is_empty() || chunk.iter().any(|&c| c == 0) {
            return Err(Error::InvalidChunk { chunk: chunk.to_vec(), dims: Vec::new() });
        }
        self.layout = Layout::Chunked(SmallVec::from_slice(chunk));
        Ok(self)
    }

    /// Append a deflate filter. Requires a chunked layout.
    pub fn set_deflate(&mut self, level: u32) -> Result<&mut Self> {
        if !matches!(self.layout, Layout::Chunked(_)) {
            return Err(Error::CompressionWithoutChunking);
        }
        if level > 9 {
            return Err(Error::InvalidCompressionLevel(level));
        }
        self.filters.push(Filter::Deflate(level as u8));
        Ok(self)
    }

    /// Configured layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Configured filter pipeline, in application order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Chunk extents, if chunked.
    pub fn chunk(&self) -> Option<&[u64]> {
        match &self.layout {
            Layout::Chunked(c) => Some(c),
            Layout::Contiguous => None,
        }
    }

    /// Check these properties against the dataspace they will be used with.
    pub fn validate_for(&self, space: &Dataspace) -> Result<()> {
        match &self.layout {
            Layout::Contiguous => {
                if !self.filters.is_empty() {
                    return Err(Error::CompressionWithoutChunking);
                }
            }
            Layout::Chunked(chunk) => {
                let fits = chunk.len() == space.rank()
                    && chunk.iter().zip(space.dims()).all(|(&c, &d)| c > 0 && c <= d);
                if !fits {
                    return Err(Error::InvalidChunk {
                        chunk: chunk.to_vec(),
                        dims: space.dims().to_vec(),
                    });
                }
            }
        }
        Ok(())
    }
}
