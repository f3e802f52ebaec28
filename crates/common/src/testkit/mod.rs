//! In-memory collaborators for exporter tests
//!
//! Nothing here touches the disk or the network, so tests can assert on
//! exact listing order and inject failures at precise points of a walk.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::prelude::*;
//! use common::testkit::{FixedTokens, MemoryFs, MemoryLinkStore};
//!
//! let fs = MemoryFs::new();
//! fs.add_file("/music/song.mp3", b"id3");
//! fs.fail_open("/music/song.mp3");
//!
//! let store = MemoryLinkStore::default();
//! let tokens = FixedTokens::sequence();
//! let issuer = LinkIssuer::new(&store, &tokens);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::fs::FileNode;
use crate::fs::FileSystem;
use crate::path::{base_name, clean, parent};
use crate::share::{LinkStore, RandomError, ShareLink, StoreError, TokenSource};

/// Fixed modification time given to every in-memory node.
pub const EPOCH_MTIME: u64 = 1_700_000_000;

#[derive(Debug, Clone)]
enum Node {
    Dir(Vec<String>),
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct Faults {
    stat: HashSet<String>,
    open: HashSet<String>,
    list: HashSet<String>,
    short: HashMap<String, usize>,
}

/// A tree held in memory. Children are listed in insertion order.
#[derive(Debug)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<String, Node>>,
    faults: Mutex<Faults>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir(Vec::new()));
        Self {
            nodes: Mutex::new(nodes),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: &str, content: &[u8]) {
        let path = clean(path);
        let mut nodes = self.nodes.lock().unwrap();
        ensure_dir(&mut nodes, &parent(&path));
        link_child(&mut nodes, &path);
        nodes.insert(path, Node::File(content.to_vec()));
    }

    /// Add an empty directory, creating missing parents.
    pub fn add_dir(&self, path: &str) {
        let path = clean(path);
        let mut nodes = self.nodes.lock().unwrap();
        ensure_dir(&mut nodes, &path);
    }

    /// Make `stat` of `path` fail.
    pub fn fail_stat(&self, path: &str) {
        self.faults.lock().unwrap().stat.insert(clean(path));
    }

    /// Make opening `path` fail.
    pub fn fail_open(&self, path: &str) {
        self.faults.lock().unwrap().open.insert(clean(path));
    }

    /// Make listing the directory at `path` fail.
    pub fn fail_list(&self, path: &str) {
        self.faults.lock().unwrap().list.insert(clean(path));
    }

    /// Make opening `path` yield only its first `len` bytes while `stat`
    /// still reports the full size, as when a file shrinks mid-export.
    pub fn shrink(&self, path: &str, len: usize) {
        self.faults.lock().unwrap().short.insert(clean(path), len);
    }

    fn injected(&self, set: impl Fn(&Faults) -> bool, path: &str) -> io::Result<()> {
        if set(&self.faults.lock().unwrap()) {
            return Err(io::Error::other(format!("injected failure at {path}")));
        }
        Ok(())
    }
}

fn ensure_dir(nodes: &mut BTreeMap<String, Node>, path: &str) {
    if nodes.contains_key(path) {
        return;
    }
    ensure_dir(nodes, &parent(path));
    link_child(nodes, path);
    nodes.insert(path.to_string(), Node::Dir(Vec::new()));
}

fn link_child(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let name = base_name(path).to_string();
    if let Some(Node::Dir(children)) = nodes.get_mut(&parent(path)) {
        if !children.contains(&name) {
            children.push(name);
        }
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such path: {path}"))
}

impl FileSystem for MemoryFs {
    fn stat(&self, path: &str) -> io::Result<FileNode> {
        let path = clean(path);
        self.injected(|f| f.stat.contains(&path), &path)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&path).ok_or_else(|| not_found(&path))?;
        let (is_dir, size, mode) = match node {
            Node::Dir(_) => (true, 0, 0o755),
            Node::File(data) => (false, data.len() as u64, 0o644),
        };
        Ok(FileNode {
            name: base_name(&path).to_string(),
            path,
            is_dir,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(EPOCH_MTIME),
            size,
            mode,
        })
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let path = clean(path);
        self.injected(|f| f.open.contains(&path), &path)?;
        match self.nodes.lock().unwrap().get(&path) {
            Some(Node::File(data)) => {
                let len = match self.faults.lock().unwrap().short.get(&path) {
                    Some(&len) => len.min(data.len()),
                    None => data.len(),
                };
                Ok(Box::new(Cursor::new(data[..len].to_vec())))
            }
            Some(Node::Dir(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {path}"),
            )),
            None => Err(not_found(&path)),
        }
    }

    fn read_dir_names(&self, path: &str) -> io::Result<Vec<String>> {
        let path = clean(path);
        self.injected(|f| f.list.contains(&path), &path)?;
        match self.nodes.lock().unwrap().get(&path) {
            Some(Node::Dir(children)) => Ok(children.clone()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {path}"),
            )),
            None => Err(not_found(&path)),
        }
    }
}

/// Link store that keeps every saved link in memory.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: Mutex<Vec<ShareLink>>,
    failing: AtomicBool,
}

impl MemoryLinkStore {
    /// Saved links in save order.
    pub fn links(&self) -> Vec<ShareLink> {
        self.links.lock().unwrap().clone()
    }

    /// Toggle rejection of every subsequent save.
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl LinkStore for MemoryLinkStore {
    fn save(&self, link: &ShareLink) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::new("link store rejected the write"));
        }
        self.links.lock().unwrap().push(link.clone());
        Ok(())
    }
}

/// Deterministic token source.
#[derive(Debug)]
pub enum FixedTokens {
    /// Every fill uses the next byte value: 1, 2, 3, ...
    Sequence(AtomicU8),
    /// Every fill fails
    Exhausted,
}

impl FixedTokens {
    pub fn sequence() -> Self {
        FixedTokens::Sequence(AtomicU8::new(0))
    }
}

impl TokenSource for FixedTokens {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomError> {
        match self {
            FixedTokens::Sequence(next) => {
                let value = next.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
                buf.fill(value);
                Ok(())
            }
            FixedTokens::Exhausted => Err(RandomError("entropy source exhausted".into())),
        }
    }
}
