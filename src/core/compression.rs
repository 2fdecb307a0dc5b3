//! Deflate filter for dataset chunks.
//!
//! Chunks are stored as plain zlib streams. The inflated size is known
//! from the chunk shape, so no size prefix is written.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Compress a chunk using zlib at `level` (0-9).
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level.min(9) as u32));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a zlib chunk that must expand to exactly `expected_len` bytes.
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected_len);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    if out.len() != expected_len {
        return Err(Error::Decompression(format!(
            "inflated {} bytes, expected {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_inflate() {
        let original = b"Hello, World! This is some test data that should compress well when repeated. ".repeat(100);

        let compressed = deflate(&original, 6).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(compressed[0], 0x78);

        let decompressed = inflate(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_every_level_inflates() {
        let original = vec![7u8; 4096];
        for level in 0..=9 {
            let compressed = deflate(&original, level).unwrap();
            assert_eq!(inflate(&compressed, original.len()).unwrap(), original);
        }
    }

    #[test]
    fn test_inflate_size_mismatch() {
        let compressed = deflate(b"abcdef", 6).unwrap();
        assert!(matches!(inflate(&compressed, 5), Err(Error::Decompression(_))));
    }

    #[test]
    fn test_inflate_garbage() {
        assert!(inflate(b"definitely not zlib", 16).is_err());
    }
}
