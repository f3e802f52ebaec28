use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// One inspected filesystem path. Fetched fresh for every visit, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Canonical path relative to the filesystem root, always starting with `/`
    pub path: String,
    /// Display name (last path component; empty for the root)
    pub name: String,
    pub is_dir: bool,
    pub modified: SystemTime,
    pub size: u64,
    /// Unix permission bits
    pub mode: u32,
}

/// Read-only filesystem capability borrowed by the exporters.
pub trait FileSystem {
    fn stat(&self, path: &str) -> io::Result<FileNode>;

    /// Open a file for reading. The stream is dropped as soon as its
    /// content has been consumed.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>>;

    /// Immediate child names in the order the backing store returns them.
    fn read_dir_names(&self, path: &str) -> io::Result<Vec<String>>;
}

/// A filesystem confined to a host directory.
///
/// Every path is interpreted relative to `root`; anything that would
/// step outside it is rejected with `PermissionDenied`.
#[derive(Debug, Clone)]
pub struct BasePathFs {
    root: PathBuf,
}

impl BasePathFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn real_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut real = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => real.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("path escapes filesystem root: {path}"),
                    ))
                }
            }
        }
        Ok(real)
    }
}

impl FileSystem for BasePathFs {
    fn stat(&self, path: &str) -> io::Result<FileNode> {
        let real = self.real_path(path)?;
        let meta = fs::metadata(&real)?;
        let name = path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(FileNode {
            path: path.to_string(),
            name,
            is_dir: meta.is_dir(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: if meta.is_dir() { 0 } else { meta.len() },
            mode: mode_of(&meta),
        })
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let real = self.real_path(path)?;
        Ok(Box::new(fs::File::open(real)?))
    }

    fn read_dir_names(&self, path: &str) -> io::Result<Vec<String>> {
        let real = self.real_path(path)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&real)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::warn!(dir = %path, name = ?raw, "skipping non UTF-8 file name");
                }
            }
        }
        Ok(names)
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_and_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.txt"), b"hello").unwrap();

        let fs = BasePathFs::new(dir.path());
        let node = fs.stat("/docs/a.txt").unwrap();
        assert_eq!(node.name, "a.txt");
        assert_eq!(node.size, 5);
        assert!(!node.is_dir);

        let docs = fs.stat("/docs").unwrap();
        assert!(docs.is_dir);
        assert_eq!(fs.read_dir_names("/docs").unwrap(), vec!["a.txt".to_string()]);

        let mut content = String::new();
        fs.open("/docs/a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_root_has_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let node = BasePathFs::new(dir.path()).stat("/").unwrap();
        assert!(node.is_dir);
        assert_eq!(node.name, "");
    }

    #[test]
    fn test_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = BasePathFs::new(dir.path()).stat("/../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = BasePathFs::new(dir.path()).stat("/nope").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
