//! Motion clip: a table collection with frame timing.
//!
//! Each table holds one row per frame. The clip's frame count is the
//! longest table, sampled at a fixed [`FPS`].

use std::path::Path;

use crate::codec::{self, Table, TableCollection};
use crate::core::{Chrono, FrameRate, FPS};
use crate::util::Result;

/// Deflate level used by [`MotionClip::save`].
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Named motion tables plus the derived frame count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionClip {
    tables: TableCollection,
    frame_count: usize,
}

impl MotionClip {
    /// Empty clip.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clip over an existing collection.
    pub fn from_tables(tables: TableCollection) -> Self {
        let frame_count = max_rows(&tables);
        Self { tables, frame_count }
    }

    /// Read a clip from a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut clip = Self::new();
        clip.load(path)?;
        Ok(clip)
    }

    /// Replace the clip's contents with the tables stored at `path`.
    ///
    /// On failure the clip is left empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.tables.clear();
        self.frame_count = 0;

        self.tables = codec::decode(path)?;
        self.frame_count = max_rows(&self.tables);
        Ok(())
    }

    /// Write the clip at [`DEFAULT_COMPRESSION_LEVEL`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with_level(path, DEFAULT_COMPRESSION_LEVEL)
    }

    /// Write the clip at the given deflate level (1-9).
    pub fn save_with_level(&self, path: impl AsRef<Path>, compression_level: u32) -> Result<()> {
        codec::encode(&self.tables, compression_level, path)
    }

    /// All tables.
    pub fn tables(&self) -> &TableCollection {
        &self.tables
    }

    /// Table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Insert or replace a table, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) -> Option<Table> {
        let previous = self.tables.insert(name.into(), table);
        self.frame_count = max_rows(&self.tables);
        previous
    }

    /// Remove a table.
    pub fn remove(&mut self, name: &str) -> Option<Table> {
        let removed = self.tables.remove(name);
        self.frame_count = max_rows(&self.tables);
        removed
    }

    /// Number of frames (longest table).
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.frame_count
    }

    /// Samples per second.
    #[inline]
    pub fn fps(&self) -> Chrono {
        FPS
    }

    /// Clip length in seconds.
    pub fn total_length(&self) -> Chrono {
        self.rate().duration(self.frame_count)
    }

    /// Time of a frame. The index is not range-checked.
    pub fn time(&self, frame_index: i32) -> Chrono {
        self.rate().frame_time(frame_index)
    }

    /// Frame at a time, truncated toward zero. The time is not range-checked.
    pub fn frame_index(&self, time: Chrono) -> i32 {
        self.rate().frame_index(time)
    }

    fn rate(&self) -> FrameRate {
        FrameRate::new(self.fps())
    }
}

fn max_rows(tables: &TableCollection) -> usize {
    tables.values().map(Vec::len).max().unwrap_or(0)
}
