mod common;

use std::fs;

use common::{WadBuilder, first_payload_offset};
use printrospector::error::ErrorKind;
use printrospector::wad::{ArchiveFlags, ArchiveState};
use printrospector::{
    ArchiveSource, EntryFilter, Error, ExtractOptions, Inflater, Input, NoProgress,
    WadExtractor,
};
use tempfile::TempDir;

fn extract(archive: &[u8], options: ExtractOptions) -> (TempDir, printrospector::Result<u64>) {
    let out = TempDir::new().unwrap();
    let result = WadExtractor::new(archive, options)
        .and_then(|mut wad| wad.extract_all(out.path(), &mut NoProgress))
        .map(|summary| summary.bytes_written);
    (out, result)
}

#[test]
fn extracts_stored_entry() {
    let archive = WadBuilder::new(1).stored("a.txt", b"hello").build();
    let (out, result) = extract(&archive, ExtractOptions::default());

    assert_eq!(result.unwrap(), 5);
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");
}

#[test]
fn extracts_compressed_entry() {
    let contents = b"the quick brown fox ".repeat(200);
    let archive = WadBuilder::new(1).compressed("fox.txt", &contents).build();

    let mut wad = WadExtractor::new(&archive, ExtractOptions::default()).unwrap();
    let entry = wad.list_entries()[0].clone();
    assert!(entry.is_compressed);
    assert!(entry.compressed_size < entry.uncompressed_size);

    let out = TempDir::new().unwrap();
    let summary = wad.extract_all(out.path(), &mut NoProgress).unwrap();
    assert_eq!(summary.entries, 1);
    assert_eq!(summary.bytes_written, contents.len() as u64);
    assert_eq!(fs::read(out.path().join("fox.txt")).unwrap(), contents);
    assert_eq!(wad.state(), ArchiveState::Done);
}

#[test]
fn small_inflate_capacity_grows_to_size_hint() {
    let contents = vec![7u8; 100_000];
    let archive = WadBuilder::new(1).compressed("zeros.bin", &contents).build();
    let options = ExtractOptions {
        inflate_capacity: 16,
        ..ExtractOptions::default()
    };

    let (out, result) = extract(&archive, options);
    assert_eq!(result.unwrap(), 100_000);
    assert_eq!(fs::read(out.path().join("zeros.bin")).unwrap(), contents);
}

#[test]
fn stored_entries_never_allocate_inflate_space() {
    let archive = WadBuilder::new(1).stored("a.txt", b"hello").build();
    let options = ExtractOptions {
        inflate_capacity: usize::MAX,
        ..ExtractOptions::default()
    };

    let (out, result) = extract(&archive, options.clone());
    assert_eq!(result.unwrap(), 5);
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");

    let compressed = WadBuilder::new(1).compressed("a.txt", b"hello").build();
    let (_out, result) = extract(&compressed, options);
    assert!(matches!(result.unwrap_err(), Error::OutOfMemory(_)));
}

#[test]
fn extract_to_memory_reuses_inflater() {
    let archive = WadBuilder::new(1)
        .compressed("one", b"first entry")
        .stored("two", b"raw")
        .compressed("three", b"third entry")
        .build();
    let wad = WadExtractor::new(&archive, ExtractOptions::default()).unwrap();
    let mut inflater = Inflater::with_capacity(64).unwrap();

    let entries = wad.list_entries();
    assert_eq!(wad.extract_to_memory(&mut inflater, &entries[0]).unwrap(), b"first entry");
    assert_eq!(wad.extract_to_memory(&mut inflater, &entries[1]).unwrap(), b"raw");
    assert_eq!(wad.extract_to_memory(&mut inflater, &entries[2]).unwrap(), b"third entry");
}

#[test]
fn bad_magic_writes_nothing() {
    let mut archive = WadBuilder::new(1).stored("a.txt", b"hello").build();
    archive[..5].copy_from_slice(b"PK\x03\x04\x00");

    let (out, result) = extract(&archive, ExtractOptions::default());
    let err = result.unwrap_err();
    assert!(matches!(err, Error::BadMagic(_)));
    assert_eq!(err.kind(), ErrorKind::FormatIntegrity);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn reads_v2_flags() {
    let archive = WadBuilder::new(2)
        .flags(ArchiveFlags::MEMORY_MAPPED.bits())
        .stored("a.txt", b"hello")
        .build();

    let wad = WadExtractor::new(&archive, ExtractOptions::default()).unwrap();
    assert_eq!(wad.header().version, 2);
    assert_eq!(wad.header().flags, Some(ArchiveFlags::MEMORY_MAPPED));
    assert_eq!(wad.state(), ArchiveState::EntriesRead);
    assert_eq!(wad.list_entries()[0].start_offset as usize, first_payload_offset(&archive));
}

#[test]
fn creates_nested_directories() {
    let archive = WadBuilder::new(1)
        .stored("Textures/ui/button.dds", b"DDS ")
        .compressed("Sound/music/theme.ogg", b"OggS OggS OggS")
        .build();

    let (out, result) = extract(&archive, ExtractOptions::default());
    result.unwrap();
    assert_eq!(fs::read(out.path().join("Textures/ui/button.dds")).unwrap(), b"DDS ");
    assert_eq!(
        fs::read(out.path().join("Sound/music/theme.ogg")).unwrap(),
        b"OggS OggS OggS"
    );
}

#[test]
fn extracts_from_hex_input() {
    let archive = WadBuilder::new(1).stored("a.txt", b"hello").build();
    let text = hex::encode(&archive);

    let source = ArchiveSource::load(&Input::Hex(text)).unwrap();
    assert_eq!(source.as_bytes(), &archive[..]);

    let (out, result) = extract(source.as_bytes(), ExtractOptions::default());
    result.unwrap();
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");
}

#[test]
fn extracts_from_mapped_file() {
    let archive = WadBuilder::new(1)
        .compressed("a.txt", b"mapped contents")
        .build();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Root.wad");
    fs::write(&path, &archive).unwrap();

    let source = ArchiveSource::load(&Input::File(path)).unwrap();
    assert_eq!(source.as_bytes(), &archive[..]);

    let (out, result) = extract(source.as_bytes(), ExtractOptions::default());
    result.unwrap();
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"mapped contents");
}

#[test]
fn missing_input_file_is_os_error() {
    let dir = TempDir::new().unwrap();
    let err = ArchiveSource::open(&dir.path().join("missing.wad")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Os);
    assert!(err.raw_os_error().is_some());
}

#[test]
fn checksums_are_advisory_by_default() {
    let archive = WadBuilder::new(1)
        .with_checksum("a.txt", b"hello", 0xDEADBEEF)
        .build();

    let (_out, result) = extract(&archive, ExtractOptions::default());
    result.unwrap();
}

#[test]
fn verifies_checksums_on_request() {
    let options = ExtractOptions {
        verify_checksums: true,
        ..ExtractOptions::default()
    };

    let good = WadBuilder::new(1).compressed("a.txt", b"hello").build();
    let (_out, result) = extract(&good, options.clone());
    result.unwrap();

    let bad = WadBuilder::new(1)
        .with_checksum("a.txt", b"hello", 0xDEADBEEF)
        .build();
    let (out, result) = extract(&bad, options);
    assert!(matches!(
        result.unwrap_err(),
        Error::ChecksumMismatch { expected: 0xDEADBEEF, .. }
    ));
    assert!(!out.path().join("a.txt").exists());
}

#[test]
fn rejects_unsafe_paths() {
    let archive = WadBuilder::new(1).stored("../evil.txt", b"boo").build();
    let parent = TempDir::new().unwrap();
    let out = parent.path().join("out");

    let mut wad = WadExtractor::new(&archive, ExtractOptions::default()).unwrap();
    let err = wad.extract_all(&out, &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::UnsafePath(ref p) if p == "../evil.txt"));
    assert!(!parent.path().join("evil.txt").exists());
}

#[test]
fn first_failure_stops_the_batch() {
    let archive = WadBuilder::new(1)
        .stored("first.txt", b"1")
        .stored("/abs.txt", b"2")
        .stored("third.txt", b"3")
        .build();

    let (out, result) = extract(&archive, ExtractOptions::default());
    assert!(matches!(result.unwrap_err(), Error::UnsafePath(_)));
    assert!(out.path().join("first.txt").exists());
    assert!(!out.path().join("third.txt").exists());
}

#[test]
fn entry_past_end_is_out_of_bounds() {
    let mut archive = WadBuilder::new(1).stored("a.txt", b"hello").build();
    // Push the first entry's start offset past the end of the archive.
    let offset_at = 13;
    let bogus = archive.len() as u32 - 2;
    archive[offset_at..offset_at + 4].copy_from_slice(&bogus.to_le_bytes());

    let (_out, result) = extract(&archive, ExtractOptions::default());
    assert!(matches!(
        result.unwrap_err(),
        Error::EntryOutOfBounds { len, .. } if len == archive.len()
    ));
}

#[test]
fn corrupt_compressed_payload_is_bad_data() {
    let mut archive = WadBuilder::new(1)
        .compressed("a.txt", &b"abcdefgh".repeat(64))
        .build();
    let start = first_payload_offset(&archive);
    // Keep the zlib header, garble the deflate blocks.
    for byte in &mut archive[start + 2..] {
        *byte = 0xFF;
    }

    let (_out, result) = extract(&archive, ExtractOptions::default());
    assert!(matches!(result.unwrap_err(), Error::BadData(_)));
}

#[test]
fn progress_is_batched() {
    let mut builder = WadBuilder::new(1);
    for i in 0..5 {
        builder = builder.stored(&format!("f{i}"), b"x");
    }
    let archive = builder.build();
    let options = ExtractOptions {
        progress_interval: 2,
        ..ExtractOptions::default()
    };

    let mut updates = Vec::new();
    let out = TempDir::new().unwrap();
    let mut wad = WadExtractor::new(&archive, options).unwrap();
    wad.extract_all(out.path(), &mut |current: usize, total: usize| {
        updates.push((current, total))
    })
    .unwrap();

    assert_eq!(updates, vec![(2, 5), (4, 5), (5, 5)]);
}

#[test]
fn filters_select_entries_in_table_order() {
    let archive = WadBuilder::new(1)
        .stored("b.xml", b"b")
        .stored("a.dds", b"a")
        .stored("dir/c.xml", b"c")
        .build();

    let mut seen = Vec::new();
    let out = TempDir::new().unwrap();
    let mut wad = WadExtractor::new(&archive, ExtractOptions::default()).unwrap();
    let summary = wad
        .extract_matching(
            out.path(),
            &EntryFilter::new(vec!["*.xml".to_string()]),
            &mut |current: usize, total: usize| seen.push((current, total)),
        )
        .unwrap();

    assert_eq!(summary.entries, 2);
    assert_eq!(seen, vec![(2, 2)]);
    assert!(out.path().join("b.xml").exists());
    assert!(out.path().join("dir/c.xml").exists());
    assert!(!out.path().join("a.dds").exists());
}

#[test]
fn empty_archive_extracts_nothing() {
    let archive = WadBuilder::new(2).build();
    let (out, result) = extract(&archive, ExtractOptions::default());
    assert_eq!(result.unwrap(), 0);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
