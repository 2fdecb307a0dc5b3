//! Container writer.
//!
//! Datasets are written as soon as they are created. Groups only exist in
//! memory until [`FileWriter::close`], which writes them bottom-up, stores
//! the root position in the header and sets the frozen flag. A writer that
//! is dropped without `close` leaves an unfinalized file behind.

use byteorder::{ByteOrder, LittleEndian};

use super::format::*;
use super::props::{DatasetCreateProps, Datatype, Filter, Layout};
use super::space::{chunk_origins, strides, Dataspace};
use super::stream::OStream;
use crate::core::deflate;
use crate::util::{Error, Result};

use std::path::Path;

/// Where a pending link points.
#[derive(Debug, Clone, Copy)]
enum PendingTarget {
    /// Index into `FileWriter::groups`
    Group(usize),
    /// Position of a dataset header block
    Dataset(u64),
}

#[derive(Debug)]
struct PendingLink {
    name: String,
    target: PendingTarget,
}

/// Group waiting to be written on close.
#[derive(Debug, Default)]
struct PendingGroup {
    links: Vec<PendingLink>,
}

impl PendingGroup {
    fn check_name(&self, name: &str) -> Result<()> {
        validate_link_name(name)?;
        if self.links.iter().any(|l| l.name == name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn add_link(&mut self, name: &str, target: PendingTarget) -> Result<()> {
        self.check_name(name)?;
        self.links.push(PendingLink { name: name.to_string(), target });
        Ok(())
    }

    fn retarget(&mut self, name: &str, target: PendingTarget) {
        if let Some(link) = self.links.iter_mut().find(|l| l.name == name) {
            link.target = target;
        }
    }
}

/// Container file open for writing.
pub struct FileWriter {
    name: String,
    stream: OStream,
    frozen: bool,
    /// Index 0 is the root group; children always follow their parent.
    groups: Vec<PendingGroup>,
}

impl FileWriter {
    /// Create (or truncate) a container file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let name = path.as_ref().to_string_lossy().to_string();
        let mut stream = OStream::create(&path)?;

        stream.write_bytes(CONTAINER_MAGIC)?;
        stream.write_u8(NOT_FROZEN_FLAG)?;
        stream.write_u16(CURRENT_VERSION)?;
        stream.write_u64(0)?; // Root position placeholder

        Ok(Self {
            name,
            stream,
            frozen: false,
            groups: vec![PendingGroup::default()],
        })
    }

    /// Handle to the root group.
    pub fn root(&mut self) -> GroupWriter<'_> {
        GroupWriter { file: self, index: 0 }
    }

    /// Create a group directly under the root.
    pub fn create_group(&mut self, name: &str) -> Result<GroupWriter<'_>> {
        self.new_group(0, name)
    }

    fn new_group(&mut self, parent: usize, name: &str) -> Result<GroupWriter<'_>> {
        if self.frozen {
            return Err(Error::other("container is already closed"));
        }
        let index = self.groups.len();
        self.groups[parent].add_link(name, PendingTarget::Group(index))?;
        self.groups.push(PendingGroup::default());
        Ok(GroupWriter { file: self, index })
    }

    /// Write every pending group, point the header at the root and freeze.
    pub fn close(mut self) -> Result<()> {
        let mut group_pos = vec![0u64; self.groups.len()];

        // Children have larger indices than their parents.
        for index in (0..self.groups.len()).rev() {
            let mut links = std::mem::take(&mut self.groups[index].links);
            links.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

            let mut records = Vec::with_capacity(links.len());
            for link in &links {
                let name_pos = self.stream.write_block(link.name.as_bytes())?;
                let target = match link.target {
                    PendingTarget::Group(child) => make_group_target(group_pos[child]),
                    PendingTarget::Dataset(pos) => make_dataset_target(pos),
                };
                records.push((name_pos, target));
            }

            group_pos[index] = self.stream.pos();
            self.stream.write_u64(records.len() as u64)?;
            for (name_pos, target) in records {
                self.stream.write_u64(name_pos)?;
                self.stream.write_u64(target)?;
            }
        }

        self.stream.seek(ROOT_POS_OFFSET as u64)?;
        self.stream.write_u64(group_pos[0])?;
        self.stream.seek(FROZEN_OFFSET as u64)?;
        self.stream.write_u8(FROZEN_FLAG)?;
        self.stream.flush()?;
        self.frozen = true;
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if !self.frozen {
            tracing::debug!(file = %self.name, "container writer dropped before close, file left unfinalized");
        }
    }
}

/// Handle to a group being written.
pub struct GroupWriter<'a> {
    file: &'a mut FileWriter,
    index: usize,
}

impl GroupWriter<'_> {
    /// Create a child group.
    pub fn create_group(&mut self, name: &str) -> Result<GroupWriter<'_>> {
        self.file.new_group(self.index, name)
    }

    /// Create a dataset in this group.
    ///
    /// The dataset reads back as zeros until [`DatasetWriter::write_f32`]
    /// stores its contents.
    pub fn create_dataset(
        &mut self,
        name: &str,
        dtype: Datatype,
        space: &Dataspace,
        props: &DatasetCreateProps,
    ) -> Result<DatasetWriter<'_>> {
        props.validate_for(space)?;
        space
            .num_bytes(dtype.num_bytes())
            .filter(|&n| n <= isize::MAX as u64)
            .ok_or_else(|| Error::invalid(format!("dataspace {} is too large", space)))?;

        let unallocated = match props.layout() {
            Layout::Contiguous => StoredLayout::Contiguous(0),
            Layout::Chunked(chunk) => {
                StoredLayout::Chunked(vec![0; chunk_origins(space.dims(), chunk).len()])
            }
        };
        let header = encode_dataset_header(dtype, space, props, &unallocated);

        self.file.groups[self.index].check_name(name)?;
        let header_pos = self.file.stream.write_block(&header)?;
        self.file.groups[self.index].add_link(name, PendingTarget::Dataset(header_pos))?;

        Ok(DatasetWriter {
            file: &mut *self.file,
            group: self.index,
            name: name.to_string(),
            dtype,
            space: space.clone(),
            props: props.clone(),
        })
    }
}

/// Handle to a dataset being written.
pub struct DatasetWriter<'a> {
    file: &'a mut FileWriter,
    group: usize,
    name: String,
    dtype: Datatype,
    space: Dataspace,
    props: DatasetCreateProps,
}

impl DatasetWriter<'_> {
    /// Write the whole dataset from one row-major buffer.
    pub fn write_f32(&mut self, data: &[f32]) -> Result<()> {
        let expected = self.space.num_points() as usize;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch { expected, actual: data.len() });
        }

        let stored = match self.props.layout() {
            Layout::Contiguous => {
                let mut bytes = vec![0u8; data.len() * self.dtype.num_bytes()];
                LittleEndian::write_f32_into(data, &mut bytes);
                StoredLayout::Contiguous(self.file.stream.write_block(&bytes)?)
            }
            Layout::Chunked(chunk) => {
                let chunk = chunk.clone();
                let mut positions = Vec::new();
                for origin in chunk_origins(self.space.dims(), &chunk) {
                    let values = gather_chunk(data, self.space.dims(), &origin, &chunk);
                    let mut bytes = vec![0u8; values.len() * self.dtype.num_bytes()];
                    LittleEndian::write_f32_into(&values, &mut bytes);
                    let bytes = apply_filters(bytes, self.props.filters())?;
                    positions.push(self.file.stream.write_block(&bytes)?);
                }
                StoredLayout::Chunked(positions)
            }
        };

        let header = encode_dataset_header(self.dtype, &self.space, &self.props, &stored);
        let header_pos = self.file.stream.write_block(&header)?;
        self.file.groups[self.group].retarget(&self.name, PendingTarget::Dataset(header_pos));
        Ok(())
    }
}

/// Block positions of a dataset's stored data (0 = not yet written).
enum StoredLayout {
    Contiguous(u64),
    Chunked(Vec<u64>),
}

fn encode_dataset_header(
    dtype: Datatype,
    space: &Dataspace,
    props: &DatasetCreateProps,
    stored: &StoredLayout,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.push(dtype.code());
    out.push(space.rank() as u8);
    for &d in space.dims() {
        out.extend_from_slice(&d.to_le_bytes());
    }

    match (props.layout(), stored) {
        (Layout::Chunked(chunk), StoredLayout::Chunked(positions)) => {
            out.push(LAYOUT_CHUNKED);
            for &c in chunk.iter() {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.push(props.filters().len() as u8);
            for filter in props.filters() {
                out.push(filter.id());
                out.push(filter.param());
            }
            out.extend_from_slice(&(positions.len() as u64).to_le_bytes());
            for &pos in positions {
                out.extend_from_slice(&pos.to_le_bytes());
            }
        }
        (_, StoredLayout::Contiguous(pos)) => {
            out.push(LAYOUT_CONTIGUOUS);
            out.extend_from_slice(&pos.to_le_bytes());
        }
        (Layout::Contiguous, StoredLayout::Chunked(_)) => {
            out.push(LAYOUT_CONTIGUOUS);
            out.extend_from_slice(&0u64.to_le_bytes());
        }
    }
    out
}

/// Copy one chunk out of a row-major buffer, zero-padding past the edges.
fn gather_chunk(data: &[f32], dims: &[u64], origin: &[u64], chunk: &[u64]) -> Vec<f32> {
    let src_strides = strides(dims);
    let chunk_strides = strides(chunk);
    let points: u64 = chunk.iter().product();

    let mut out = vec![0f32; points as usize];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut src = 0u64;
        let mut inside = true;
        for axis in 0..dims.len() {
            let coord = origin[axis] + (k as u64 / chunk_strides[axis]) % chunk[axis];
            if coord >= dims[axis] {
                inside = false;
                break;
            }
            src += coord * src_strides[axis];
        }
        if inside {
            *slot = data[src as usize];
        }
    }
    out
}

fn apply_filters(mut bytes: Vec<u8>, filters: &[Filter]) -> Result<Vec<u8>> {
    for filter in filters {
        bytes = match *filter {
            Filter::Deflate(level) => deflate(&bytes, level)?,
        };
    }
    Ok(bytes)
}
