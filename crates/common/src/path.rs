//! Request path resolution.
//!
//! Client tokens arrive percent-encoded and relative to the browsing root.
//! They leave as canonical absolute paths: rooted at `/`, `/`-separated,
//! with no `.` or `..` segments and no repeated separators.

use percent_encoding::percent_decode_str;

use crate::error::ExportError;

pub const SEPARATOR: char = '/';

/// The ordered, de-duplicated set of canonical paths one export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget(Vec<String>);

impl ExportTarget {
    /// Resolve a comma separated `files` list against `base`.
    ///
    /// An absent or empty list selects `base` itself. A literal `+` is kept
    /// as `+` rather than decoded to a space. Any token with a malformed
    /// escape fails the whole resolution.
    pub fn resolve(files: Option<&str>, base: &str) -> Result<Self, ExportError> {
        let base = slash_clean(base);
        let files = files.unwrap_or_default();
        if files.is_empty() {
            return Ok(Self(vec![base]));
        }

        let mut paths: Vec<String> = Vec::new();
        for token in files.split(',') {
            let name = unescape(&token.replace('+', "%2B")).ok_or_else(|| {
                ExportError::MalformedEncoding {
                    token: token.to_string(),
                }
            })?;
            let path = join(&base, &slash_clean(&name));
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(Self(paths))
    }

    /// Build a target from already canonical paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for path in paths {
            let path = slash_clean(path.as_ref());
            if !out.contains(&path) {
                out.push(path);
            }
        }
        Self(out)
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Root `name` at `/` and clean it.
pub fn slash_clean(name: &str) -> String {
    let name = name.replace('\\', "/");
    if name.starts_with(SEPARATOR) {
        clean(&name)
    } else {
        clean(&format!("/{name}"))
    }
}

/// Lexically clean a rooted path. `..` never climbs above `/`.
pub fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Join `name` onto `base` and clean the result.
pub fn join(base: &str, name: &str) -> String {
    clean(&format!("{base}/{name}"))
}

/// Last path component; empty for `/`.
pub fn base_name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or_default()
}

/// Parent directory; `/` is its own parent.
pub fn parent(path: &str) -> String {
    let path = clean(path);
    match path.rfind(SEPARATOR) {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Longest common ancestor of `paths`, aligned on `sep` boundaries.
///
/// A single path is its own common prefix. Paths that share nothing but
/// the root yield `/`.
pub fn common_prefix(sep: char, paths: &[String]) -> String {
    let mut sep_buf = [0u8; 4];
    let sep_str: &str = sep.encode_utf8(&mut sep_buf);

    match paths {
        [] => return String::new(),
        [only] => return clean(only),
        _ => {}
    }

    let mut common = format!("{}{sep_str}", clean(&paths[0])).into_bytes();
    for path in &paths[1..] {
        let candidate = format!("{}{sep_str}", clean(path)).into_bytes();
        if candidate.len() < common.len() {
            common.truncate(candidate.len());
        }
        if let Some(diverge) = common
            .iter()
            .zip(candidate.iter())
            .position(|(a, b)| a != b)
        {
            common.truncate(diverge);
        }
    }

    // Drop the partial trailing segment together with its separator.
    let sep_byte = sep_str.as_bytes()[0];
    match common.iter().rposition(|&b| b == sep_byte) {
        Some(idx) => common.truncate(idx),
        None => common.clear(),
    }

    let prefix = String::from_utf8_lossy(&common).into_owned();
    if prefix.is_empty() {
        sep_str.to_string()
    } else {
        prefix
    }
}

/// Base used to name archive entries.
///
/// With several paths this is their common prefix. A lone path is named
/// relative to its parent so the selection keeps its own name inside the
/// archive.
pub fn naming_base(target: &ExportTarget) -> String {
    match target.paths() {
        [only] => parent(only),
        paths => common_prefix(SEPARATOR, paths),
    }
}

/// Name of `path` inside an archive rooted at `base`.
pub fn entry_name(path: &str, base: &str) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative.trim_start_matches(SEPARATOR).to_string()
}

/// Strict percent decoding. Returns `None` on a truncated or non-hex escape
/// or when the decoded bytes are not UTF-8.
///
/// `percent_decode_str` passes malformed escapes through untouched, so every
/// `%` is checked to start a full `%XX` triplet first.
fn unescape(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'%')
        .all(|(i, _)| {
            matches!(
                bytes.get(i + 1..i + 3),
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
        });
    if !well_formed {
        return None;
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
