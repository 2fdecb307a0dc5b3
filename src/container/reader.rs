//! Container reader implementation.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::format::*;
use super::props::{Datatype, Filter};
use super::space::{chunk_count, chunk_origins, strides, Dataspace};
use crate::core::inflate;
use crate::util::{Error, Result};

/// Random-access view of a container file, mapped or read through a handle.
pub struct IStreams {
    inner: StreamsInner,
    version: u16,
    frozen: bool,
    size: u64,
}

enum StreamsInner {
    Mmap(Mmap),
    /// Seek and read share one handle.
    File(Arc<RwLock<File>>),
}

impl IStreams {
    /// Map a container file and check its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a container file, mapped or through a plain handle.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if use_mmap {
            // The mapping is read-only; a concurrent writer truncating the file is not guarded against.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(Arc::new(RwLock::new(file)))
        };

        let (version, frozen) = match &inner {
            StreamsInner::Mmap(mmap) => Self::parse_header(mmap)?,
            StreamsInner::File(file) => {
                let mut f = file.write();
                let mut header = [0u8; HEADER_SIZE];
                f.seek(SeekFrom::Start(0))?;
                f.read_exact(&mut header)?;
                Self::parse_header(&header)?
            }
        };

        Ok(Self { inner, version, frozen, size })
    }

    /// Check magic and version, return the version and frozen flag.
    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }

        if &data[0..5] != CONTAINER_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let frozen = data[FROZEN_OFFSET] == FROZEN_FLAG;
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if version != CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        Ok((version, frozen))
    }

    /// Whether the writer reached `close`.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// File length in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Root group position stored in the header.
    pub fn root_pos(&self) -> Result<u64> {
        self.read_u64(ROOT_POS_OFFSET as u64)
    }

    fn check_range(&self, pos: u64, len: u64) -> Result<()> {
        match pos.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            Some(end) => Err(Error::UnexpectedEof(end)),
            None => Err(Error::UnexpectedEof(u64::MAX)),
        }
    }

    /// Copy `len` bytes starting at `pos`.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from `pos`, failing if the range runs past the end.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(pos, buf.len() as u64)?;

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..(pos as usize + buf.len())]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Little-endian u64 at `pos`.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Payload of the size-prefixed block at `pos`.
    pub fn read_block(&self, pos: u64) -> Result<Vec<u8>> {
        if pos < MIN_BLOCK_POS {
            return Err(Error::invalid(format!("block position {} inside header", pos)));
        }
        let len = self.read_u64(pos)?;
        self.check_range(pos + 8, len)?;
        self.read_bytes(pos + 8, len as usize)
    }
}

/// Container file opened for reading.
pub struct ContainerFile {
    streams: Arc<IStreams>,
    root: Group,
}

impl ContainerFile {
    /// Open a container file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_streams(IStreams::open(path)?)
    }

    /// Open without memory mapping.
    pub fn open_buffered(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_streams(IStreams::open_opts(path, false)?)
    }

    fn from_streams(streams: IStreams) -> Result<Self> {
        if !streams.is_frozen() {
            return Err(Error::NotFinalized);
        }
        let streams = Arc::new(streams);
        let root_pos = streams.root_pos()?;
        let root = Group::new(streams.clone(), root_pos)?;
        Ok(Self { streams, root })
    }

    /// Get the format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.streams.version()
    }

    /// Get the total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.streams.size()
    }

    /// Get the root group.
    #[inline]
    pub fn root(&self) -> &Group {
        &self.root
    }
}

/// Kind of object a link points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Group,
    Dataset,
}

impl LinkKind {
    fn label(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Dataset => "dataset",
        }
    }
}

#[derive(Clone, Debug)]
struct Link {
    name: String,
    target: u64,
}

/// A group in the container hierarchy.
///
/// Links are kept in the order they are stored, which is byte-wise
/// ascending by name.
#[derive(Clone)]
pub struct Group {
    streams: Arc<IStreams>,
    links: Vec<Link>,
}

impl Group {
    fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        if pos < MIN_BLOCK_POS {
            return Err(Error::invalid(format!("group position {} inside header", pos)));
        }
        let count = streams.read_u64(pos)?;
        streams.check_range(pos + 8, count.saturating_mul(LINK_RECORD_SIZE))?;

        let mut links = Vec::with_capacity(count as usize);
        for i in 0..count {
            let record = pos + 8 + i * LINK_RECORD_SIZE;
            let name_pos = streams.read_u64(record)?;
            let target = streams.read_u64(record + 8)?;
            let name = String::from_utf8(streams.read_block(name_pos)?)?;
            links.push(Link { name, target });
        }

        Ok(Self { streams, links })
    }

    /// Number of direct links.
    #[inline]
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    fn link(&self, index: usize) -> Result<&Link> {
        self.links.get(index).ok_or(Error::LinkOutOfBounds {
            index,
            count: self.links.len(),
        })
    }

    /// Full name of the link at `index`.
    pub fn link_name(&self, index: usize) -> Result<&str> {
        Ok(&self.link(index)?.name)
    }

    /// Kind of the link at `index`.
    pub fn link_kind(&self, index: usize) -> Result<LinkKind> {
        let target = self.link(index)?.target;
        Ok(if is_dataset_target(target) { LinkKind::Dataset } else { LinkKind::Group })
    }

    /// Iterate over link names in storage order.
    pub fn link_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.links.iter().map(|l| l.name.as_str())
    }

    /// Find a link index by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.links
            .binary_search_by(|l| l.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .or_else(|| self.links.iter().position(|l| l.name == name))
    }

    fn target_of(&self, name: &str, expected: LinkKind) -> Result<u64> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::LinkNotFound(name.to_string()))?;
        let actual = self.link_kind(index)?;
        if actual != expected {
            return Err(Error::TypeMismatch {
                expected: expected.label().to_string(),
                actual: actual.label().to_string(),
            });
        }
        Ok(extract_pos(self.links[index].target))
    }

    /// Open a child group by name.
    pub fn open_group(&self, name: &str) -> Result<Group> {
        let pos = self.target_of(name, LinkKind::Group)?;
        Group::new(self.streams.clone(), pos)
    }

    /// Open a child dataset by name.
    pub fn open_dataset(&self, name: &str) -> Result<Dataset> {
        let pos = self.target_of(name, LinkKind::Dataset)?;
        Dataset::new(self.streams.clone(), pos)
    }
}

/// Stored layout as read from a dataset header.
#[derive(Clone, Debug)]
enum StoredLayout {
    Contiguous(u64),
    Chunked {
        chunk: SmallVec<[u64; 4]>,
        filters: Vec<Filter>,
        positions: Vec<u64>,
    },
}

/// A typed, shaped array in the container.
pub struct Dataset {
    streams: Arc<IStreams>,
    dtype: Datatype,
    space: Dataspace,
    layout: StoredLayout,
}

impl Dataset {
    fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let header = streams.read_block(pos)?;
        let (dtype, space, layout) = parse_dataset_header(&header, streams.size())
            .map_err(|e| match e {
                Error::Io(_) => Error::invalid("truncated dataset header"),
                other => other,
            })?;
        Ok(Self { streams, dtype, space, layout })
    }

    /// Element type.
    pub fn datatype(&self) -> Datatype {
        self.dtype
    }

    /// Dataset shape.
    pub fn space(&self) -> &Dataspace {
        &self.space
    }

    /// Chunk extents, if chunked.
    pub fn chunk(&self) -> Option<&[u64]> {
        match &self.layout {
            StoredLayout::Chunked { chunk, .. } => Some(chunk),
            StoredLayout::Contiguous(_) => None,
        }
    }

    /// Filter pipeline applied to chunks.
    pub fn filters(&self) -> &[Filter] {
        match &self.layout {
            StoredLayout::Chunked { filters, .. } => filters,
            StoredLayout::Contiguous(_) => &[],
        }
    }

    /// Read the whole dataset into one row-major buffer.
    pub fn read_f32(&self) -> Result<Vec<f32>> {
        // Extents were bounded when the header was parsed.
        let points = self.space.num_points() as usize;
        let elem = self.dtype.num_bytes();

        match &self.layout {
            StoredLayout::Contiguous(0) => Ok(vec![0f32; points]),
            StoredLayout::Contiguous(pos) => {
                let bytes = self.streams.read_block(*pos)?;
                if bytes.len() != points * elem {
                    return Err(Error::invalid(format!(
                        "contiguous block holds {} bytes, dataspace needs {}",
                        bytes.len(),
                        points * elem
                    )));
                }
                let mut out = vec![0f32; points];
                LittleEndian::read_f32_into(&bytes, &mut out);
                Ok(out)
            }
            StoredLayout::Chunked { chunk, filters, positions } => {
                let chunk_points = chunk.iter().product::<u64>() as usize;
                let chunk_bytes = chunk_points * elem;
                let mut out = vec![0f32; points];
                let mut values = vec![0f32; chunk_points];

                for (origin, &pos) in chunk_origins(self.space.dims(), chunk).iter().zip(positions) {
                    if pos == 0 {
                        continue;
                    }
                    let bytes = reverse_filters(self.streams.read_block(pos)?, filters, chunk_bytes)?;
                    if bytes.len() != chunk_bytes {
                        return Err(Error::invalid(format!(
                            "chunk holds {} bytes, expected {}",
                            bytes.len(),
                            chunk_bytes
                        )));
                    }
                    LittleEndian::read_f32_into(&bytes, &mut values);
                    scatter_chunk(&values, &mut out, self.space.dims(), origin, chunk);
                }
                Ok(out)
            }
        }
    }
}

/// Parse a dataset header stored in a file of `file_size` bytes.
///
/// Extents are rejected unless the decoded data could plausibly come from
/// that file, so later buffer sizes and chunk grids cannot overflow.
fn parse_dataset_header(header: &[u8], file_size: u64) -> Result<(Datatype, Dataspace, StoredLayout)> {
    let mut cur = Cursor::new(header);

    let dtype = Datatype::from_code(cur.read_u8()?)?;
    let rank = cur.read_u8()? as usize;
    let mut dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        dims.push(cur.read_u64::<LittleEndian>()?);
    }
    let space = Dataspace::from(dims);

    let limit = file_size.saturating_mul(MAX_EXPANSION_RATIO).min(isize::MAX as u64);
    match space.num_bytes(dtype.num_bytes()) {
        Some(bytes) if bytes <= limit => {}
        _ => {
            return Err(Error::invalid(format!(
                "dataspace {} is too large for a {} byte file",
                space, file_size
            )))
        }
    }

    let layout = match cur.read_u8()? {
        LAYOUT_CONTIGUOUS => StoredLayout::Contiguous(cur.read_u64::<LittleEndian>()?),
        LAYOUT_CHUNKED => {
            let mut chunk: SmallVec<[u64; 4]> = SmallVec::with_capacity(rank);
            for _ in 0..rank {
                chunk.push(cur.read_u64::<LittleEndian>()?);
            }
            if chunk.iter().zip(space.dims()).any(|(&c, &d)| c == 0 || c > d) {
                return Err(Error::InvalidChunk { chunk: chunk.to_vec(), dims: space.dims().to_vec() });
            }

            let num_filters = cur.read_u8()?;
            let mut filters = Vec::with_capacity(num_filters as usize);
            for _ in 0..num_filters {
                let id = cur.read_u8()?;
                let param = cur.read_u8()?;
                filters.push(Filter::from_parts(id, param)?);
            }

            let count = cur.read_u64::<LittleEndian>()?;
            let expected = chunk_count(space.dims(), &chunk)
                .ok_or_else(|| Error::invalid(format!("chunk grid of {} overflows", space)))?;
            if count != expected {
                return Err(Error::invalid(format!("{} chunks stored, grid needs {}", count, expected)));
            }
            let mut positions = Vec::with_capacity(count as usize);
            for _ in 0..count {
                positions.push(cur.read_u64::<LittleEndian>()?);
            }
            StoredLayout::Chunked { chunk, filters, positions }
        }
        other => return Err(Error::invalid(format!("unknown layout tag {}", other))),
    };

    Ok((dtype, space, layout))
}

/// Undo the filter pipeline, last filter first.
fn reverse_filters(mut bytes: Vec<u8>, filters: &[Filter], chunk_bytes: usize) -> Result<Vec<u8>> {
    for filter in filters.iter().rev() {
        bytes = match filter {
            Filter::Deflate(_) => inflate(&bytes, chunk_bytes)?,
        };
    }
    Ok(bytes)
}

/// Copy one chunk into a row-major buffer, dropping the padded edges.
fn scatter_chunk(values: &[f32], out: &mut [f32], dims: &[u64], origin: &[u64], chunk: &[u64]) {
    let dst_strides = strides(dims);
    let chunk_strides = strides(chunk);

    for (k, &value) in values.iter().enumerate() {
        let mut dst = 0u64;
        let mut inside = true;
        for axis in 0..dims.len() {
            let coord = origin[axis] + (k as u64 / chunk_strides[axis]) % chunk[axis];
            if coord >= dims[axis] {
                inside = false;
                break;
            }
            dst += coord * dst_strides[axis];
        }
        if inside {
            out[dst as usize] = value;
        }
    }
}
