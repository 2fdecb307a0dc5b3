//! Integration tests for writing table containers and verifying round-trip.

use motion_tables::codec::{decode, encode, TableCollection};
use motion_tables::container::{ContainerFile, DatasetCreateProps, Dataspace, Datatype, FileWriter, Filter};
use motion_tables::{Error, MotionClip, DATASET_NAME};

use tempfile::tempdir;

fn collection(entries: &[(&str, Vec<Vec<f32>>)]) -> TableCollection {
    entries
        .iter()
        .map(|(name, table)| (name.to_string(), table.clone()))
        .collect()
}

/// Deterministic pseudo-random table with awkward float values.
fn noisy_table(rows: usize, cols: usize, seed: u32) -> Vec<Vec<f32>> {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    (0..rows)
        .map(|_| {
            (0..cols)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    f32::from_bits(state & 0xBF7F_FFFF)
                })
                .collect()
        })
        .collect()
}

fn assert_bit_exact(a: &TableCollection, b: &TableCollection) {
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    for (name, table) in a {
        let other = &b[name];
        assert_eq!(table.len(), other.len(), "row count of {}", name);
        for (row_a, row_b) in table.iter().zip(other) {
            let bits_a: Vec<u32> = row_a.iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u32> = row_b.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b, "values of {}", name);
        }
    }
}

#[test]
fn test_roundtrip_every_level() {
    let dir = tempdir().unwrap();
    let tables = collection(&[
        ("hips", noisy_table(37, 7, 1)),
        ("left_hand", noisy_table(5, 3, 2)),
        ("single", noisy_table(1, 1, 3)),
        ("wide", noisy_table(2, 11, 4)),
        ("tall", noisy_table(64, 1, 5)),
    ]);

    for level in 1..=9 {
        let path = dir.path().join(format!("level{}.mtb", level));
        encode(&tables, level, &path).unwrap();
        let decoded = decode(&path).unwrap();
        assert_bit_exact(&tables, &decoded);
    }
}

#[test]
fn test_rejects_invalid_level_without_touching_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.mtb");
    std::fs::write(&path, b"keep me").unwrap();

    let tables = collection(&[("a", vec![vec![1.0]])]);
    assert!(matches!(encode(&tables, 0, &path), Err(Error::InvalidCompressionLevel(0))));
    assert!(matches!(encode(&tables, 10, &path), Err(Error::InvalidCompressionLevel(10))));
    assert_eq!(std::fs::read(&path).unwrap(), b"keep me");

    let fresh = dir.path().join("fresh.mtb");
    assert!(encode(&tables, 0, &fresh).is_err());
    assert!(!fresh.exists());
}

#[test]
fn test_rejects_empty_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.mtb");
    assert!(matches!(encode(&TableCollection::new(), 6, &path), Err(Error::EmptyCollection)));
    assert!(!path.exists());
}

#[test]
fn test_rejects_ragged_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ragged.mtb");
    let tables = collection(&[("ok", vec![vec![1.0, 2.0]]), ("zigzag", vec![vec![1.0, 2.0], vec![3.0]])]);

    match encode(&tables, 6, &path) {
        Err(Error::RaggedTable { table, row, expected, actual }) => {
            assert_eq!(table, "zigzag");
            assert_eq!((row, expected, actual), (1, 2, 1));
        }
        other => panic!("expected RaggedTable, got {:?}", other),
    }
    assert!(!path.exists());
}

#[test]
fn test_skips_empty_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("skip.mtb");
    let tables = collection(&[
        ("a", vec![]),
        ("b", vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
        ("c", vec![vec![], vec![]]),
    ]);

    encode(&tables, 6, &path).unwrap();
    let decoded = decode(&path).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded["b"], vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
}

#[test]
fn test_only_empty_tables_gives_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hollow.mtb");
    encode(&collection(&[("a", vec![])]), 6, &path).unwrap();
    assert!(decode(&path).unwrap().is_empty());
}

#[test]
fn test_decode_left_right() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lr.mtb");
    let left = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
    let right = vec![vec![1.5], vec![2.5], vec![3.5], vec![4.5]];

    encode(&collection(&[("left", left.clone()), ("right", right.clone())]), 4, &path).unwrap();

    let decoded = decode(&path).unwrap();
    assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["left", "right"]);
    assert_eq!(decoded["left"], left);
    assert_eq!(decoded["right"], right);
}

#[test]
fn test_on_disk_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schema.mtb");
    encode(
        &collection(&[("big", noisy_table(10, 8, 9)), ("narrow", noisy_table(6, 2, 10)), ("short", noisy_table(1, 5, 11))]),
        7,
        &path,
    )
    .unwrap();

    let file = ContainerFile::open(&path).unwrap();
    let expect = [("big", [10u64, 8], [3u64, 3]), ("narrow", [6, 2], [2, 2]), ("short", [1, 5], [1, 3])];
    for (name, dims, chunk) in expect {
        let dataset = file.root().open_group(name).unwrap().open_dataset(DATASET_NAME).unwrap();
        assert_eq!(dataset.datatype(), Datatype::Float32);
        assert_eq!(dataset.space().dims(), &dims);
        assert_eq!(dataset.chunk(), Some(&chunk[..]));
        assert_eq!(dataset.filters(), &[Filter::Deflate(7)]);
    }
}

#[test]
fn test_idempotent_cycles() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.mtb");
    let second = dir.path().join("second.mtb");
    let tables = collection(&[("x", noisy_table(20, 4, 21)), ("y", noisy_table(3, 9, 22))]);

    encode(&tables, 5, &first).unwrap();
    let once = decode(&first).unwrap();
    encode(&once, 5, &second).unwrap();
    let twice = decode(&second).unwrap();

    assert_bit_exact(&once, &twice);
    assert_bit_exact(&tables, &twice);
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_long_and_unicode_names_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.mtb");
    let long = "joint_".repeat(80);
    assert!(long.len() > 255);

    let tables = collection(&[
        (long.as_str(), vec![vec![1.0]]),
        ("Épaule gauche", vec![vec![2.0]]),
        ("CaseSensitive", vec![vec![3.0]]),
        ("casesensitive", vec![vec![4.0]]),
    ]);
    encode(&tables, 6, &path).unwrap();
    assert_eq!(decode(&path).unwrap(), tables);
}

#[test]
fn test_invalid_group_name_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slash.mtb");
    let tables = collection(&[("arm/left", vec![vec![1.0]])]);
    assert!(matches!(encode(&tables, 6, &path), Err(Error::InvalidName(_))));
    // the file was created before the failure but never finalized
    assert!(matches!(decode(&path), Err(Error::NotFinalized)));
}

#[test]
fn test_decode_errors() {
    let dir = tempdir().unwrap();

    assert!(matches!(decode(dir.path().join("missing.mtb")), Err(Error::FileNotFound(_))));

    let junk = dir.path().join("junk.mtb");
    std::fs::write(&junk, vec![0x42u8; 64]).unwrap();
    assert!(matches!(decode(&junk), Err(Error::InvalidMagic)));

    let short = dir.path().join("short.mtb");
    std::fs::write(&short, b"MTbl").unwrap();
    assert!(matches!(decode(&short), Err(Error::UnexpectedEof(_))));
}

#[test]
fn test_decode_rejects_corrupted_chunk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.mtb");
    encode(&collection(&[("t", noisy_table(30, 6, 40))]), 9, &path).unwrap();

    // Block order: placeholder dataset header, then the first chunk.
    let mut bytes = std::fs::read(&path).unwrap();
    let block_len = |bytes: &[u8], at: usize| u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap()) as usize;
    let header_block = motion_tables::container::HEADER_SIZE;
    let chunk_block = header_block + 8 + block_len(&bytes, header_block);
    let payload_len = block_len(&bytes, chunk_block);
    assert!(payload_len > 4);
    for b in &mut bytes[chunk_block + 8..chunk_block + 8 + payload_len] {
        *b ^= 0x5A;
    }
    std::fs::write(&path, &bytes).unwrap();

    assert!(decode(&path).is_err());
}

#[test]
fn test_decode_rejects_impossible_extents() {
    let dir = tempdir().unwrap();

    for (i, extent) in [1u64 << 40, 1 << 30, 1 << 20].into_iter().enumerate() {
        let path = dir.path().join(format!("extent{}.mtb", i));
        {
            let mut file = FileWriter::create(&path).unwrap();
            let mut group = file.create_group("t").unwrap();
            let mut props = DatasetCreateProps::new();
            props.set_chunk(&[1, 1]).unwrap();
            group
                .create_dataset(DATASET_NAME, Datatype::Float32, &Dataspace::d2(1, 1), &props)
                .unwrap();
            file.close().unwrap();
        }

        // The unwritten dataset header is the first block: dtype, rank, then both extents.
        let mut bytes = std::fs::read(&path).unwrap();
        let dims_at = motion_tables::container::HEADER_SIZE + 8 + 2;
        for axis in 0..2 {
            let at = dims_at + axis * 8;
            bytes[at..at + 8].copy_from_slice(&extent.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(decode(&path), Err(Error::InvalidStructure(_))), "extent {}", extent);
    }
}

#[test]
fn test_decode_accepts_uncompressed_chunks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.mtb");
    {
        let mut file = FileWriter::create(&path).unwrap();
        let mut group = file.create_group("raw").unwrap();
        let mut props = DatasetCreateProps::new();
        props.set_chunk(&[2, 2]).unwrap();
        let mut dataset = group
            .create_dataset(DATASET_NAME, Datatype::Float32, &Dataspace::d2(3, 3), &props)
            .unwrap();
        dataset.write_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        file.close().unwrap();
    }

    let decoded = decode(&path).unwrap();
    assert_eq!(decoded["raw"], vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]]);
}

#[test]
fn test_motion_clip_file_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clip.mtb");

    let mut clip = MotionClip::new();
    clip.insert("root", noisy_table(90, 7, 50));
    clip.insert("spine", noisy_table(60, 4, 51));
    clip.save(&path).unwrap();

    let file = ContainerFile::open(&path).unwrap();
    let dataset = file.root().open_group("root").unwrap().open_dataset(DATASET_NAME).unwrap();
    assert_eq!(dataset.filters(), &[Filter::Deflate(6)]);

    let mut loaded = MotionClip::new();
    loaded.load(&path).unwrap();
    assert_eq!(loaded.total_frames(), 90);
    assert_eq!(loaded.total_length(), 3.0);
    assert_eq!(loaded.time(30), 1.0);
    assert_eq!(loaded.frame_index(1.5), 45);
    assert_bit_exact(clip.tables(), loaded.tables());
}
