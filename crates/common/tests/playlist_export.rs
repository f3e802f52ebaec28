//! Integration tests for playlist exports and the links they mint

mod common;

use ::common::prelude::*;
use ::common::share::LINK_TTL;
use ::common::testkit::{FixedTokens, MemoryLinkStore};
use time::OffsetDateTime;

fn run(
    fs: &dyn FileSystem,
    access: &dyn AccessCheck,
    store: &MemoryLinkStore,
    tokens: &dyn TokenSource,
    files: &str,
) -> Result<String, ExportError> {
    let issuer = LinkIssuer::new(store, tokens);
    let job = PlaylistExport {
        fs,
        access,
        classifier: &MimeClassifier,
        issuer: &issuer,
        owner: 42,
        base_url: "http://h",
    };
    let target = ExportTarget::resolve(Some(files), "/music")?;
    let mut out = Vec::new();
    export_playlist(&job, &target, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_playlist_lists_audio_only() {
    let fs = common::sample_tree();
    let store = MemoryLinkStore::default();

    let text = run(&fs, &AllowAll, &store, &OsTokenSource, "").unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "#EXTM3U");
    let link = &store.links()[0];
    assert_eq!(lines[1], format!("http://h/api/public/dl/{}/song.mp3", link.hash));
    assert!(!text.contains("notes.txt"));

    assert_eq!(link.path, "/music/song.mp3");
    assert_eq!(link.user_id, 42);
}

#[test]
fn test_each_export_mints_fresh_links() {
    let fs = common::sample_tree();
    let store = MemoryLinkStore::default();

    let before = OffsetDateTime::now_utc();
    let first = run(&fs, &AllowAll, &store, &OsTokenSource, "song.mp3").unwrap();
    let second = run(&fs, &AllowAll, &store, &OsTokenSource, "song.mp3").unwrap();
    let after = OffsetDateTime::now_utc();

    assert_ne!(first, second);
    let links = store.links();
    assert_eq!(links.len(), 2);
    assert_ne!(links[0].hash, links[1].hash);
    for link in &links {
        assert_eq!(link.path, "/music/song.mp3");
        assert!(link.expire >= before + LINK_TTL);
        assert!(link.expire <= after + LINK_TTL);
    }
}

#[test]
fn test_denied_media_is_left_out() {
    let fs = common::sample_tree();
    let store = MemoryLinkStore::default();
    let policy = |p: &str| p != "/music/song.mp3";

    let text = run(&fs, &policy, &store, &OsTokenSource, "").unwrap();
    assert_eq!(text, "#EXTM3U\n");
    assert!(store.links().is_empty());
}

#[test]
fn test_random_failure_aborts_the_playlist() {
    let fs = common::sample_tree();
    let store = MemoryLinkStore::default();

    let err = run(&fs, &AllowAll, &store, &FixedTokens::Exhausted, "").unwrap_err();
    assert!(matches!(err, ExportError::RandomSource(_)));
    assert!(store.links().is_empty());
}

#[test]
fn test_deterministic_tokens() {
    let fs = common::sample_tree();
    let store = MemoryLinkStore::default();
    let tokens = FixedTokens::sequence();

    let text = run(&fs, &AllowAll, &store, &tokens, "").unwrap();
    // six 0x01 bytes encode to "AQEBAQEB"
    assert!(text.contains("/api/public/dl/AQEBAQEB/song.mp3"));
}
