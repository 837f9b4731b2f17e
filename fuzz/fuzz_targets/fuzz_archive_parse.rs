#![no_main]

use libfuzzer_sys::fuzz_target;
use epicvault::{Archive, IndexedArchive, OpenMode};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fuzz_target!(|data: &[u8]| {
    // Anything shorter than a trailer is rejected before parsing
    if data.len() < 20 {
        return;
    }

    // Write fuzz data to temporary file
    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };

    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    // Try to open archive - should never panic
    let mut archive = match IndexedArchive::open(temp_file.path(), OpenMode::Read) {
        Ok(a) => a,
        Err(_) => return, // Expected for invalid data
    };

    // Try to read each entry - should never panic
    for entry in archive.list_entries() {
        let _ = archive.read_entry(&entry);
    }
    let _ = archive.total_extracted_size();

    // Lookups with odd paths - should never panic
    let _ = archive.read_entry("");
    let _ = archive.read_entry("../../../etc/passwd");

    // Extraction must stay inside its destination
    if let Ok(dir) = tempdir() {
        let _ = archive.extract_all(dir.path(), &mut |_, _| {});
    }
});
