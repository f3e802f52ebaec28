//! Shared fixtures for daemon integration tests
#![allow(dead_code)]

use std::io::{Cursor, Read};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use stash_daemon::http_server;
use stash_daemon::state::{RuleConfig, UserConfig};
use stash_daemon::{ServiceConfig, ServiceState};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const GUEST_TOKEN: &str = "guest-token";
pub const TEAM_TOKEN: &str = "team-token";

pub struct TestApp {
    pub root: TempDir,
    pub state: ServiceState,
    pub router: Router,
}

impl TestApp {
    /// Serve a fresh tree:
    ///
    /// ```text
    /// /docs/a.txt
    /// /docs/b.txt
    /// /docs/sub/c.txt
    /// /secret/key.pem
    /// /music/song.mp3
    /// /music/notes.txt
    /// /team/t.txt
    /// /.env
    /// ```
    ///
    /// `admin` sees everything except `/secret` and dot files, `guest` has no
    /// download permission and `team` is confined to `/team`.
    pub async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let write = |rel: &str, body: &[u8]| {
            let path = root.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        };
        write("docs/a.txt", b"alpha");
        write("docs/b.txt", b"bravo");
        write("docs/sub/c.txt", b"charlie");
        write("secret/key.pem", b"do not ship");
        write("music/song.mp3", b"ID3 not really an mp3");
        write("music/notes.txt", b"liner notes");
        write("team/t.txt", b"team only");
        write(".env", b"TOKEN=1");

        let user = |id: u64, name: &str, token: &str, scope: &str, download: bool| UserConfig {
            id,
            username: name.into(),
            token: token.into(),
            scope: scope.into(),
            download,
            rules: Vec::new(),
        };
        let mut admin = user(1, "admin", ADMIN_TOKEN, "/", true);
        admin.rules.push(RuleConfig {
            allow: false,
            path: Some("/secret".into()),
            regex: None,
        });

        let config = ServiceConfig {
            port: 0,
            root: root.path().to_path_buf(),
            users: vec![
                admin,
                user(2, "guest", GUEST_TOKEN, "/", false),
                user(3, "team", TEAM_TOKEN, "/team", true),
            ],
            rules: vec![RuleConfig {
                allow: false,
                path: None,
                regex: Some(r"/\.[^/]*$".into()),
            }],
            base_url: Some("http://stash.test".into()),
            sqlite_path: None,
            log_level: tracing::Level::DEBUG,
            log_dir: None,
        };

        let state = ServiceState::from_config(&config).await.unwrap();
        let http_config = http_server::Config::new(
            "127.0.0.1:0".parse().unwrap(),
            tracing::Level::DEBUG,
        );
        let router = http_server::router(&http_config, state.clone());

        Self {
            root,
            state,
            router,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Sorted names of every entry in a zip.
pub fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

/// Sorted names and bodies of the regular files in a tar.
pub fn tar_files(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(bytes);
    let mut files: Vec<(String, String)> = archive
        .entries()
        .unwrap()
        .map(Result::unwrap)
        .filter(|entry| entry.header().entry_type().is_file())
        .map(|mut entry| {
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            (name, body)
        })
        .collect();
    files.sort();
    files
}
