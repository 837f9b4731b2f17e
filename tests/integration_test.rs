//! Integration tests for the indexed archive container

use epicvault::{
    open_archive, Archive, ArchiveFormat, IndexedArchive, OpenMode, VaultError,
    DIRECTORY_SENTINEL,
};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

fn read_all(archive: &mut dyn Archive, path: &str) -> Option<Vec<u8>> {
    archive.get_entry(path).unwrap().map(|mut reader| {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        data
    })
}

/// Write the a.txt / dir/ / dir/b.txt archive used throughout
fn write_scenario(path: &Path) {
    let mut archive: Box<dyn Archive> = Box::new(IndexedArchive::open(path, OpenMode::Write).unwrap());
    archive.add_entry("a.txt", Some(&mut &b"hello"[..])).unwrap();
    archive.add_entry("dir/", None).unwrap();
    archive.add_entry("dir/b.txt", Some(&mut &b"world"[..])).unwrap();
    archive.close().unwrap();
}

#[test]
fn test_concrete_scenario() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());

    let mut archive: Box<dyn Archive> =
        Box::new(IndexedArchive::open(temp_file.path(), OpenMode::Read).unwrap());

    assert_eq!(archive.list_entries(), vec!["a.txt", "dir/", "dir/b.txt"]);
    assert_eq!(read_all(archive.as_mut(), "a.txt").unwrap(), b"hello");
    assert!(read_all(archive.as_mut(), "dir/").is_none());
    assert_eq!(read_all(archive.as_mut(), "dir/b.txt").unwrap(), b"world");
    assert_eq!(archive.total_extracted_size().unwrap(), 10);
    archive.close().unwrap();
}

#[test]
fn test_basic_archive_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let archive_path = temp_file.path();

    let compressible = b"This is test data that should compress well. ".repeat(100);
    let large: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();

    // Create archive
    {
        let mut archive = IndexedArchive::open(archive_path, OpenMode::Write).unwrap();
        archive.add_entry("test.txt", Some(&mut &b"Hello, World!"[..])).unwrap();
        archive.add_entry("compressible.txt", Some(&mut compressible.as_slice())).unwrap();
        archive.add_entry("data/large.bin", Some(&mut large.as_slice())).unwrap();
        archive.add_entry("empty.txt", Some(&mut &b""[..])).unwrap();
        Box::new(archive).close().unwrap();
    }

    // Read archive
    {
        let mut archive = IndexedArchive::open(archive_path, OpenMode::Read).unwrap();
        assert_eq!(archive.entry_count(), 4);

        assert_eq!(archive.read_entry("test.txt").unwrap().unwrap(), b"Hello, World!");
        assert_eq!(archive.read_entry("compressible.txt").unwrap().unwrap(), compressible);
        assert_eq!(archive.read_entry("data/large.bin").unwrap().unwrap(), large);
        assert_eq!(archive.read_entry("empty.txt").unwrap().unwrap(), b"");
    }

    // Compression actually happened
    let file_len = fs::metadata(archive_path).unwrap().len();
    assert!(file_len < (compressible.len() + large.len()) as u64);
}

#[test]
fn test_streamed_entries() {
    let temp_file = NamedTempFile::new().unwrap();
    let payload = vec![7u8; 200_000];

    {
        let mut archive: Box<dyn Archive> =
            Box::new(IndexedArchive::open(temp_file.path(), OpenMode::Write).unwrap());
        let mut writer = archive.create_entry("streamed.bin", payload.len() as u64).unwrap();
        for chunk in payload.chunks(8192) {
            writer.write_all(chunk).unwrap();
        }
        writer.finish().unwrap();

        // Dropping a writer finishes its frame too
        {
            let mut writer = archive.create_entry("dropped.txt", 4).unwrap();
            writer.write_all(b"drop").unwrap();
        }
        archive.add_entry("after.txt", Some(&mut &b"after"[..])).unwrap();
        archive.close().unwrap();
    }

    let mut archive = IndexedArchive::open(temp_file.path(), OpenMode::Read).unwrap();
    assert_eq!(archive.read_entry("streamed.bin").unwrap().unwrap(), payload);
    assert_eq!(archive.read_entry("dropped.txt").unwrap().unwrap(), b"drop");
    assert_eq!(archive.read_entry("after.txt").unwrap().unwrap(), b"after");
}

#[test]
fn test_directory_sentinel() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());

    let mut archive = IndexedArchive::open(temp_file.path(), OpenMode::Read).unwrap();
    let dir = archive.entries().iter().find(|e| e.path == "dir/").unwrap();
    assert_eq!(dir.content_length, DIRECTORY_SENTINEL);
    assert!(archive.read_entry("dir/").unwrap().is_none());

    let out = tempdir().unwrap();
    let target = out.path().join("only-dir");
    archive.extract_to_file("dir/", &target).unwrap();
    assert!(target.is_dir());

    let mut archive: Box<dyn Archive> = Box::new(archive);
    archive.extract_all(out.path(), &mut |_, _| {}).unwrap();
    assert!(out.path().join("dir").is_dir());
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(out.path().join("dir/b.txt")).unwrap(), b"world");
}

#[test]
fn test_extract_all_reports_progress() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());

    let mut archive = open_archive_indexed(temp_file.path());
    let out = tempdir().unwrap();

    let mut events = Vec::new();
    archive
        .extract_all(out.path(), &mut |description, bytes| {
            events.push((description.to_string(), bytes))
        })
        .unwrap();

    let total: u64 = events.iter().map(|(_, n)| n).sum();
    assert_eq!(total, 10);
    assert!(events.iter().any(|(d, _)| d == "Extracting: dir/b.txt"));
}

fn open_archive_indexed_write(path: &Path) -> Box<dyn Archive> {
    Box::new(IndexedArchive::open(path, OpenMode::Write).unwrap())
}

fn open_archive_indexed(path: &Path) -> Box<dyn Archive> {
    Box::new(IndexedArchive::open(path, OpenMode::Read).unwrap())
}

#[test]
fn test_size_aggregation_ignores_order() {
    let entries: [(&str, &[u8]); 3] = [("x", b"12345"), ("y", b""), ("z", b"1234567")];
    let dir = tempdir().unwrap();

    let mut totals = Vec::new();
    for (i, order) in [[0, 1, 2], [2, 0, 1], [1, 2, 0]].iter().enumerate() {
        let path = dir.path().join(format!("order{}.epiclz4", i));
        let mut archive = open_archive(&path, OpenMode::Write).unwrap();
        archive.add_entry("empty-dir/", None).unwrap();
        for &idx in order {
            let (name, data) = entries[idx];
            archive.add_entry(name, Some(&mut &data[..])).unwrap();
        }
        archive.close().unwrap();

        let mut archive = open_archive(&path, OpenMode::Read).unwrap();
        totals.push(archive.total_extracted_size().unwrap());
    }

    assert_eq!(totals, vec![12, 12, 12]);
}

#[test]
fn test_mode_guard_read_mode() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());
    let before = fs::read(temp_file.path()).unwrap();

    let mut archive = open_archive_indexed(temp_file.path());
    let err = archive.add_entry("new.txt", Some(&mut &b"x"[..])).unwrap_err();
    assert!(matches!(err, VaultError::InvalidMode { mode: OpenMode::Read, .. }));
    assert!(matches!(
        archive.create_entry("new.txt", 1),
        Err(VaultError::InvalidMode { .. })
    ));
    archive.close().unwrap();

    assert_eq!(fs::read(temp_file.path()).unwrap(), before);
}

#[test]
fn test_mode_guard_write_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("guard.epiclz4");

    let mut archive = open_archive(&path, OpenMode::Write).unwrap();
    archive.add_entry("a.txt", Some(&mut &b"hello"[..])).unwrap();

    assert!(matches!(archive.get_entry("a.txt"), Err(VaultError::InvalidMode { .. })));
    assert!(matches!(
        archive.extract_all(dir.path(), &mut |_, _| {}),
        Err(VaultError::InvalidMode { .. })
    ));
    assert!(matches!(
        archive.extract_to_file("a.txt", &dir.path().join("a.txt")),
        Err(VaultError::InvalidMode { .. })
    ));
    assert!(!dir.path().join("a.txt").exists());

    // Listing and sizing work in either mode
    assert_eq!(archive.list_entries(), vec!["a.txt"]);
    assert_eq!(archive.total_extracted_size().unwrap(), 5);
    archive.close().unwrap();
}

#[test]
fn test_entry_not_found() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());

    let mut archive = open_archive_indexed(temp_file.path());
    assert!(matches!(archive.get_entry("missing.txt"), Err(VaultError::EntryNotFound(_))));
}

#[test]
fn test_duplicate_paths_first_wins() {
    let temp_file = NamedTempFile::new().unwrap();
    {
        let mut archive = open_archive_indexed_write(temp_file.path());
        archive.add_entry("x", Some(&mut &b"first"[..])).unwrap();
        archive.add_entry("x", Some(&mut &b"second"[..])).unwrap();
        archive.close().unwrap();
    }

    let mut archive = open_archive_indexed(temp_file.path());
    assert_eq!(archive.list_entries(), vec!["x", "x"]);
    assert_eq!(read_all(archive.as_mut(), "x").unwrap(), b"first");
    assert_eq!(archive.total_extracted_size().unwrap(), 11);
}

#[test]
fn test_backslash_lookup() {
    let temp_file = NamedTempFile::new().unwrap();
    write_scenario(temp_file.path());

    let mut archive = IndexedArchive::open(temp_file.path(), OpenMode::Read).unwrap();
    assert_eq!(archive.read_entry(r"dir\b.txt").unwrap().unwrap(), b"world");
}

#[test]
fn test_registry_dispatch() {
    let dir = tempdir().unwrap();

    for format in ArchiveFormat::ALL {
        let path = dir.path().join(format!("game.{}", format.extension()));
        let mut archive = format.open(&path, OpenMode::Write).unwrap();
        archive.add_entry("hello.txt", Some(&mut &b"hi"[..])).unwrap();
        archive.close().unwrap();

        let mut archive = open_archive(&path, OpenMode::Read).unwrap();
        assert_eq!(read_all(archive.as_mut(), "hello.txt").unwrap(), b"hi");
    }

    // Indexed archives are recognized by their trailer
    let indexed = dir.path().join("game.epiclz4");
    let bytes = fs::read(indexed).unwrap();
    assert_eq!(&bytes[bytes.len() - 20..bytes.len() - 16], &0x0065_7069u32.to_le_bytes());
}
