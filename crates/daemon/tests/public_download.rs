//! Playlist exports and the public download route behind their links

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_text, header, TestApp, ADMIN_TOKEN, TEAM_TOKEN};
use time::{Duration, OffsetDateTime};

use ::common::prelude::ShareLink;

/// Pull the `(hash, name)` of every link out of a playlist body.
fn playlist_links(text: &str, origin: &str) -> Vec<(String, String)> {
    let prefix = format!("{origin}/api/public/dl/");
    text.lines()
        .skip(1)
        .map(|line| {
            let rest = line.strip_prefix(&prefix).unwrap();
            let (hash, name) = rest.split_once('/').unwrap();
            (hash.to_string(), name.to_string())
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_playlist_links_download_without_credentials() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/raw/music?algo=m3u&base=http://h", Some(ADMIN_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "audio/x-mpegurl");
    assert_eq!(
        header(&response, "content-disposition"),
        "attachment; filename*=utf-8''music.m3u"
    );

    let text = body_text(response).await;
    assert!(text.starts_with("#EXTM3U\n"));
    let links = playlist_links(&text, "http://h");
    assert_eq!(links.len(), 1);
    let (hash, name) = &links[0];
    assert_eq!(name, "song.mp3");

    let stored = app
        .state
        .database()
        .get_share_link(hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.path, "/music/song.mp3");
    assert_eq!(stored.user_id, 1);

    let response = app.get(&format!("/api/public/dl/{hash}/{name}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-disposition"),
        "attachment; filename*=utf-8''song.mp3"
    );
    assert_eq!(body_bytes(response).await, b"ID3 not really an mp3");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_playlist_falls_back_to_configured_origin() {
    let app = TestApp::new().await;

    let response = app.get("/api/raw/music?algo=m3u", Some(ADMIN_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert_eq!(playlist_links(&text, "http://stash.test").len(), 1);
}

#[tokio::test]
async fn test_unknown_and_expired_links_are_not_found() {
    let app = TestApp::new().await;
    let database = app.state.database();

    let response = app.get("/api/public/dl/missing1/song.mp3", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let expired = ShareLink {
        hash: "expired1".into(),
        path: "/music/song.mp3".into(),
        expire: OffsetDateTime::now_utc() - Duration::hours(1),
        user_id: 1,
    };
    database.save_share_link(&expired).await.unwrap();

    let response = app.get("/api/public/dl/expired1/song.mp3", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(database.get_share_link("expired1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_links_resolve_inside_the_owner_scope() {
    let app = TestApp::new().await;
    let database = app.state.database();
    let expire = OffsetDateTime::now_utc() + Duration::hours(1);

    let scoped = ShareLink {
        hash: "teamlink".into(),
        path: "/t.txt".into(),
        expire,
        user_id: 3,
    };
    database.save_share_link(&scoped).await.unwrap();
    let response = app.get("/api/public/dl/teamlink/t.txt", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "team only");

    let directory = ShareLink {
        hash: "dirlink1".into(),
        path: "/docs".into(),
        expire,
        user_id: 1,
    };
    database.save_share_link(&directory).await.unwrap();
    let response = app.get("/api/public/dl/dirlink1/docs", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let orphan = ShareLink {
        hash: "orphan01".into(),
        path: "/docs/a.txt".into(),
        expire,
        user_id: 99,
    };
    database.save_share_link(&orphan).await.unwrap();
    let response = app.get("/api/public/dl/orphan01/a.txt", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scoped_playlist_links_stay_scoped() {
    let app = TestApp::new().await;
    std::fs::write(app.root.path().join("team/jingle.ogg"), b"OggS").unwrap();

    let response = app
        .get("/api/raw/?algo=m3u&base=http://h/", Some(TEAM_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-disposition"),
        "attachment; filename*=utf-8''playlist.m3u"
    );
    let links = playlist_links(&body_text(response).await, "http://h");
    assert_eq!(links.len(), 1);

    let stored = app
        .state
        .database()
        .get_share_link(&links[0].0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.path, "/jingle.ogg");
    assert_eq!(stored.user_id, 3);
}
