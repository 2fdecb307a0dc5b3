//! Container format constants and structures.

/// Magic bytes at the start of a table container file.
pub const CONTAINER_MAGIC: &[u8; 5] = b"MTbl\x89";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 5;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the root group position in the header.
pub const ROOT_POS_OFFSET: usize = 8;

/// Current container format version.
pub const CURRENT_VERSION: u16 = 1;

/// Frozen flag value once every group has been written.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag value while the file is still being written.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// Bit set in a link target when it points at a dataset header.
pub const DATASET_FLAG_MASK: u64 = 1 << 63;

/// Mask to extract the actual position from a link target.
pub const OFFSET_MASK: u64 = !(1 << 63);

/// Size of one link record inside a group (name pos + target pos).
pub const LINK_RECORD_SIZE: u64 = 16;

/// Dataset layout tag: single contiguous data block.
pub const LAYOUT_CONTIGUOUS: u8 = 0;

/// Dataset layout tag: row-major grid of fixed-size chunks.
pub const LAYOUT_CHUNKED: u8 = 1;

/// Largest ratio of a dataset's decoded size to the size of its file.
///
/// zlib cannot expand data by more than about 1032:1, so a dataset that
/// claims more than this cannot have come from a well-formed file.
pub const MAX_EXPANSION_RATIO: u64 = 1032;

/// Minimum valid block position (after header).
pub const MIN_BLOCK_POS: u64 = HEADER_SIZE as u64;

/// Check if a link target points at a dataset.
#[inline]
pub const fn is_dataset_target(target: u64) -> bool {
    (target & DATASET_FLAG_MASK) != 0
}

/// Extract the file position from a link target.
#[inline]
pub const fn extract_pos(target: u64) -> u64 {
    target & OFFSET_MASK
}

/// Create a group link target.
#[inline]
pub const fn make_group_target(pos: u64) -> u64 {
    pos & OFFSET_MASK
}

/// Create a dataset link target.
#[inline]
pub const fn make_dataset_target(pos: u64) -> u64 {
    pos | DATASET_FLAG_MASK
}

/// Reject names the container cannot address as a single path element.
pub fn validate_link_name(name: &str) -> crate::util::Result<()> {
    if name.is_empty() || name.contains('/') || name == "." {
        return Err(crate::util::Error::InvalidName(name.to_string()));
    }
    Ok(())
}
