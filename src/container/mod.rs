//! Hierarchical table container format.
//!
//! A container file is a tree of named groups. Groups hold links to other
//! groups or to datasets; a dataset is a typed, shaped array stored either
//! contiguously or as a grid of independently deflated chunks.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "MTbl\x89"|  5 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 LE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Blocks ...   |  size u64 LE + payload
//! +------------------+
//! ```
//!
//! Groups are written last, bottom-up, so the root is the final record and
//! the frozen flag is only set once the whole tree is on disk.

mod format;
mod props;
mod reader;
mod space;
mod stream;
mod writer;

pub use format::*;
pub use props::{DatasetCreateProps, Datatype, Filter, Layout};
pub use reader::{ContainerFile, Dataset, Group, IStreams, LinkKind};
pub use space::Dataspace;
pub use stream::OStream;
pub use writer::{DatasetWriter, FileWriter, GroupWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Error;

    fn chunked(chunk: &[u64], level: u32) -> DatasetCreateProps {
        let mut props = DatasetCreateProps::new();
        props.set_chunk(chunk).unwrap().set_deflate(level).unwrap();
        props
    }

    #[test]
    fn test_nested_groups_roundtrip() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut file = FileWriter::create(temp.path()).unwrap();
            let mut outer = file.create_group("outer").unwrap();
            let mut inner = outer.create_group("inner").unwrap();
            let mut dataset = inner
                .create_dataset("data", Datatype::Float32, &Dataspace::d2(2, 2), &chunked(&[2, 2], 4))
                .unwrap();
            dataset.write_f32(&[1.0, 2.0, 3.0, 4.0]).unwrap();
            file.close().unwrap();
        }

        let file = ContainerFile::open(temp.path()).unwrap();
        let outer = file.root().open_group("outer").unwrap();
        let inner = outer.open_group("inner").unwrap();
        let dataset = inner.open_dataset("data").unwrap();
        assert_eq!(dataset.space().dims(), &[2, 2]);
        assert_eq!(dataset.filters(), &[Filter::Deflate(4)]);
        assert_eq!(dataset.read_f32().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_links_sorted_by_name() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut file = FileWriter::create(temp.path()).unwrap();
            for name in ["zeta", "Alpha", "mid", "alpha"] {
                file.create_group(name).unwrap();
            }
            file.close().unwrap();
        }

        let file = ContainerFile::open(temp.path()).unwrap();
        let names: Vec<&str> = file.root().link_names().collect();
        assert_eq!(names, vec!["Alpha", "alpha", "mid", "zeta"]);
        assert_eq!(file.root().link_kind(0).unwrap(), LinkKind::Group);
    }

    #[test]
    fn test_contiguous_and_unwritten() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut file = FileWriter::create(temp.path()).unwrap();
            let mut root = file.root();
            let mut plain = root
                .create_dataset("plain", Datatype::Float32, &Dataspace::simple(&[3]), &DatasetCreateProps::new())
                .unwrap();
            plain.write_f32(&[0.5, -0.25, f32::MAX]).unwrap();
            root.create_dataset("unwritten", Datatype::Float32, &Dataspace::d2(2, 2), &chunked(&[1, 2], 1))
                .unwrap();
            file.close().unwrap();
        }

        let file = ContainerFile::open_buffered(temp.path()).unwrap();
        let plain = file.root().open_dataset("plain").unwrap();
        assert!(plain.chunk().is_none());
        assert_eq!(plain.read_f32().unwrap(), vec![0.5, -0.25, f32::MAX]);

        let unwritten = file.root().open_dataset("unwritten").unwrap();
        assert_eq!(unwritten.chunk(), Some(&[1u64, 2][..]));
        assert_eq!(unwritten.read_f32().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_open_wrong_kind() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut file = FileWriter::create(temp.path()).unwrap();
            file.create_group("g").unwrap();
            file.close().unwrap();
        }

        let file = ContainerFile::open(temp.path()).unwrap();
        assert!(matches!(file.root().open_dataset("g"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(file.root().open_group("missing"), Err(Error::LinkNotFound(_))));
        assert!(matches!(file.root().link_name(3), Err(Error::LinkOutOfBounds { index: 3, count: 1 })));
    }

    #[test]
    fn test_unfinalized_file_rejected() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut file = FileWriter::create(temp.path()).unwrap();
            file.create_group("g").unwrap();
            // dropped without close
        }
        assert!(matches!(ContainerFile::open(temp.path()), Err(Error::NotFinalized)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.mtb");
        assert!(matches!(ContainerFile::open(&path), Err(Error::FileNotFound(_))));
    }
}
