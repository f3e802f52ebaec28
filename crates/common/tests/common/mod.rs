//! Shared fixtures for exporter integration tests
#![allow(dead_code)]

use std::io::{Cursor, Read};

use common::testkit::MemoryFs;
use tempfile::TempDir;

/// A small tree:
///
/// ```text
/// /root/a.txt
/// /root/dir/b.txt
/// /root/dir/c.txt
/// /root/secret/key.pem
/// /music/song.mp3
/// /music/notes.txt
/// ```
pub fn sample_tree() -> MemoryFs {
    let fs = MemoryFs::new();
    fs.add_file("/root/a.txt", b"alpha");
    fs.add_file("/root/dir/b.txt", b"bravo");
    fs.add_file("/root/dir/c.txt", b"charlie");
    fs.add_file("/root/secret/key.pem", b"do not ship");
    fs.add_file("/music/song.mp3", b"ID3");
    fs.add_file("/music/notes.txt", b"liner notes");
    fs
}

/// Same layout as [`sample_tree`] but on disk.
pub fn sample_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let write = |rel: &str, body: &[u8]| {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    };
    write("root/a.txt", b"alpha");
    write("root/dir/b.txt", b"bravo");
    write("root/dir/c.txt", b"charlie");
    write("root/secret/key.pem", b"do not ship");
    write("music/song.mp3", b"ID3");
    write("music/notes.txt", b"liner notes");
    dir
}

/// Names and bodies of every complete entry in a (possibly truncated) tar.
pub fn tar_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(bytes);
    let Ok(entries) = archive.entries() else {
        return Vec::new();
    };
    entries
        .map_while(Result::ok)
        .map(|mut entry| {
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut body = String::new();
            let _ = entry.read_to_string(&mut body);
            (name, body)
        })
        .collect()
}

pub fn tar_names(bytes: &[u8]) -> Vec<String> {
    tar_entries(bytes).into_iter().map(|(name, _)| name).collect()
}

/// Names and bodies of every entry in a finished zip.
pub fn zip_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut body = String::new();
            file.read_to_string(&mut body).unwrap();
            (file.name().to_string(), body)
        })
        .collect()
}
