//! Path traversal prevention tests
//!
//! Entry paths are stored as given, but extraction must never write outside
//! the destination directory.

use epicvault::archive::resolve_entry_path;
use epicvault::{Archive, IndexedArchive, OpenMode, VaultError};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

fn archive_with(entries: &[(&str, &[u8])]) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut archive = IndexedArchive::open(temp_file.path(), OpenMode::Write).unwrap();
    for (name, data) in entries {
        archive.add_entry(name, Some(&mut &data[..])).unwrap();
    }
    Box::new(archive).close().unwrap();
    temp_file
}

fn extract(path: &Path, destination: &Path) -> epicvault::Result<()> {
    let mut archive: Box<dyn Archive> = Box::new(IndexedArchive::open(path, OpenMode::Read).unwrap());
    archive.extract_all(destination, &mut |_, _| {})
}

#[test]
fn test_path_traversal_dot_dot() {
    let temp_file = archive_with(&[("../../escaped.txt", b"malicious")]);
    let root = tempdir().unwrap();
    let destination = root.path().join("out");

    let err = extract(temp_file.path(), &destination).unwrap_err();
    assert!(matches!(err, VaultError::UnsafePath(_)));
    assert!(!root.path().join("escaped.txt").exists());
}

#[test]
fn test_nested_dot_dot_with_backslashes() {
    let temp_file = archive_with(&[(r"GameFiles\..\..\escaped.txt", b"malicious")]);
    let root = tempdir().unwrap();

    let err = extract(temp_file.path(), &root.path().join("out")).unwrap_err();
    assert!(matches!(err, VaultError::UnsafePath(_)));
}

#[test]
fn test_absolute_path_unix() {
    let temp_file = archive_with(&[("/etc/passwd", b"data")]);
    let root = tempdir().unwrap();

    let err = extract(temp_file.path(), root.path()).unwrap_err();
    assert!(matches!(err, VaultError::UnsafePath(_)));
}

#[test]
fn test_absolute_path_windows() {
    let temp_file = archive_with(&[(r"C:\Windows\System32\evil.dll", b"data")]);
    let root = tempdir().unwrap();

    let err = extract(temp_file.path(), root.path()).unwrap_err();
    assert!(matches!(err, VaultError::UnsafePath(_)));
}

#[test]
fn test_unsafe_entry_stops_before_writing_it() {
    let temp_file = archive_with(&[("ok.txt", b"fine"), ("../bad.txt", b"bad")]);
    let root = tempdir().unwrap();
    let destination = root.path().join("out");

    assert!(extract(temp_file.path(), &destination).is_err());
    assert_eq!(fs::read(destination.join("ok.txt")).unwrap(), b"fine");
    assert!(!root.path().join("bad.txt").exists());
}

#[test]
fn test_dotted_names_are_not_traversal() {
    let temp_file = archive_with(&[("..hidden/file..txt", b"ok"), ("./a/./b.txt", b"ok")]);
    let root = tempdir().unwrap();

    extract(temp_file.path(), root.path()).unwrap();
    assert!(root.path().join("..hidden/file..txt").exists());
    assert!(root.path().join("a/b.txt").exists());
}

#[test]
fn test_resolve_entry_path_cases() {
    let root = Path::new("/restore");
    assert!(resolve_entry_path(root, "a/../../b").is_err());
    assert!(resolve_entry_path(root, "D:relative").is_err());
    assert_eq!(
        resolve_entry_path(root, "Game/Binaries/game.exe").unwrap(),
        root.join("Game").join("Binaries").join("game.exe")
    );
}
