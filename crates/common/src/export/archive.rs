use std::io::Write;

use crate::access::AccessCheck;
use crate::archive::ArchiveWriter;
use crate::error::ExportError;
use crate::format::ArchiveFormat;
use crate::fs::FileSystem;
use crate::path::{entry_name, join, ExportTarget};

use super::ExportSummary;

/// Stream every permitted path of `target` (and its subtree) into an
/// archive of `format` written to `sink`.
///
/// Entry names are the visited paths with `base` stripped. The writer is
/// finished only when every target has been walked; an error leaves the
/// sink holding whatever the codec already flushed.
pub fn export_archive<W: Write>(
    fs: &dyn FileSystem,
    access: &dyn AccessCheck,
    target: &ExportTarget,
    format: ArchiveFormat,
    base: &str,
    sink: W,
) -> Result<ExportSummary, ExportError> {
    let writer = ArchiveWriter::create(format, sink).map_err(|e| ExportError::io(base, e))?;
    let mut walk = ArchiveWalk {
        fs,
        access,
        base,
        writer,
        summary: ExportSummary::default(),
    };

    for path in target.iter() {
        walk.visit(path)?;
    }

    let ArchiveWalk {
        writer, summary, ..
    } = walk;
    writer.finish().map_err(|e| ExportError::io(base, e))?;

    tracing::info!(
        format = format.token(),
        files = summary.files,
        dirs = summary.dirs,
        denied = summary.denied,
        "archive export complete"
    );
    Ok(summary)
}

struct ArchiveWalk<'a, W: Write> {
    fs: &'a dyn FileSystem,
    access: &'a dyn AccessCheck,
    base: &'a str,
    writer: ArchiveWriter<W>,
    summary: ExportSummary,
}

impl<W: Write> ArchiveWalk<'_, W> {
    fn visit(&mut self, path: &str) -> Result<(), ExportError> {
        // Checks always run against `/` separated paths.
        let path = path.replace('\\', "/");
        if !self.access.check(&path) {
            tracing::debug!(path = %path, "access denied, skipping subtree");
            self.summary.denied += 1;
            return Ok(());
        }

        let node = self.fs.stat(&path).map_err(|e| ExportError::io(&path, e))?;
        let name = entry_name(&path, self.base);

        if !node.is_dir {
            // A file named as the base itself keeps its own name.
            let name = if name.is_empty() {
                node.name.clone()
            } else {
                name
            };
            let mut content = self.fs.open(&path).map_err(|e| ExportError::io(&path, e))?;
            tracing::debug!(path = %path, entry = %name, "adding file");
            self.writer
                .append(&name, &node, Some(&mut *content))
                .map_err(|e| ExportError::io(&path, e))?;
            self.summary.files += 1;
            return Ok(());
        }

        // The base directory itself (the filesystem root, or a target that
        // contains the other targets) gets no entry; only its children do.
        if !name.is_empty() {
            tracing::debug!(path = %path, entry = %name, "adding directory");
            self.writer
                .append(&name, &node, None)
                .map_err(|e| ExportError::io(&path, e))?;
            self.summary.dirs += 1;
        }

        let children = self
            .fs
            .read_dir_names(&path)
            .map_err(|e| ExportError::io(&path, e))?;
        for child in children {
            self.visit(&join(&path, &child))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Read;

    use super::*;
    use crate::access::AllowAll;
    use crate::path::naming_base;
    use crate::testkit::MemoryFs;

    fn tar_entries(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = tar::Archive::new(bytes);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut entry = e.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut body = String::new();
                entry.read_to_string(&mut body).unwrap();
                (name, body)
            })
            .collect()
    }

    fn sample_fs() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.add_file("/root/a.txt", b"alpha");
        fs.add_file("/root/dir/b.txt", b"bravo");
        fs.add_file("/root/dir/c.txt", b"charlie");
        fs.add_file("/root/secret/key.pem", b"hidden");
        fs
    }

    #[test]
    fn test_names_are_relative_to_base() {
        let fs = sample_fs();
        let target = ExportTarget::from_paths(["/root/a.txt", "/root/dir/b.txt"]);
        let base = naming_base(&target);
        assert_eq!(base, "/root");

        let mut out = Vec::new();
        let summary =
            export_archive(&fs, &AllowAll, &target, ArchiveFormat::Tar, &base, &mut out).unwrap();

        let entries = tar_entries(&out);
        assert_eq!(
            entries,
            vec![
                ("a.txt".to_string(), "alpha".to_string()),
                ("dir/b.txt".to_string(), "bravo".to_string()),
            ]
        );
        assert_eq!(summary.files, 2);
    }

    #[test]
    fn test_directory_recursion() {
        let fs = sample_fs();
        let target = ExportTarget::from_paths(["/root/dir"]);
        let base = naming_base(&target);

        let mut out = Vec::new();
        export_archive(&fs, &AllowAll, &target, ArchiveFormat::Tar, &base, &mut out).unwrap();

        let names: BTreeSet<String> = tar_entries(&out).into_iter().map(|(n, _)| n).collect();
        let expected: BTreeSet<String> = ["dir/", "dir/b.txt", "dir/c.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_denied_subtree_is_silently_skipped() {
        let fs = sample_fs();
        let target = ExportTarget::from_paths(["/root"]);
        let base = naming_base(&target);
        let deny_secret = |p: &str| !p.starts_with("/root/secret");

        let mut out = Vec::new();
        let summary =
            export_archive(&fs, &deny_secret, &target, ArchiveFormat::Tar, &base, &mut out)
                .unwrap();

        let names: Vec<String> = tar_entries(&out).into_iter().map(|(n, _)| n).collect();
        assert!(names.iter().all(|n| !n.contains("secret")));
        assert!(names.contains(&"root/a.txt".to_string()));
        assert!(names.contains(&"root/dir/c.txt".to_string()));
        assert_eq!(summary.denied, 1);
    }

    #[test]
    fn test_root_itself_has_no_entry() {
        let fs = MemoryFs::new();
        fs.add_file("/x.txt", b"x");
        let target = ExportTarget::from_paths(["/"]);

        let mut out = Vec::new();
        export_archive(&fs, &AllowAll, &target, ArchiveFormat::Tar, "/", &mut out).unwrap();
        let names: Vec<String> = tar_entries(&out).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x.txt".to_string()]);
    }

    #[test]
    fn test_missing_target_aborts() {
        let fs = sample_fs();
        let target = ExportTarget::from_paths(["/root/a.txt", "/root/nope.txt"]);

        let mut out = Vec::new();
        let err = export_archive(&fs, &AllowAll, &target, ArchiveFormat::Zip, "/root", &mut out)
            .unwrap_err();
        assert!(matches!(err, ExportError::NotFound { path, .. } if path == "/root/nope.txt"));
    }

    #[test]
    fn test_denied_missing_path_is_not_an_error() {
        let fs = sample_fs();
        let target = ExportTarget::from_paths(["/root/a.txt", "/root/ghost"]);
        let deny_ghost = |p: &str| p != "/root/ghost";

        let mut out = Vec::new();
        export_archive(&fs, &deny_ghost, &target, ArchiveFormat::Tar, "/root", &mut out)
            .unwrap();
    }
}
