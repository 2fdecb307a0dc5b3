//! Append-mostly output for the container writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::Result;

/// Buffered file writer that tracks its own offset, so block positions
/// are known without asking the OS.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
        })
    }

    /// Offset the next write lands at.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Append `len: u64` then `data`; returns where the block starts.
    pub fn write_block(&mut self, data: &[u8]) -> Result<u64> {
        let at = self.pos;
        self.write_u64(data.len() as u64)?;
        self.write_bytes(data)?;
        Ok(at)
    }

    /// Move to `pos` to patch already written bytes.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.writer.flush()?;
        self.pos = self.writer.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Flush and `fsync` the data.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_track_writes() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let mut stream = OStream::create(temp.path()).unwrap();

        stream.write_u8(1).unwrap();
        stream.write_u16(2).unwrap();
        assert_eq!(stream.pos(), 3);

        let at = stream.write_block(b"abcd").unwrap();
        assert_eq!(at, 3);
        assert_eq!(stream.pos(), 3 + 8 + 4);

        stream.seek(1).unwrap();
        assert_eq!(stream.pos(), 1);
        stream.write_u16(0xBEEF).unwrap();
        stream.flush().unwrap();

        let bytes = std::fs::read(temp.path()).unwrap();
        assert_eq!(bytes.len(), 15);
        assert_eq!(&bytes[..3], &[1, 0xEF, 0xBE]);
        assert_eq!(&bytes[11..], b"abcd");
    }
}
