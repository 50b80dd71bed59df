//! Content-addressed fingerprints for incremental builds.
//!
//! Every input that can change the rendered site is reduced to a SHA-256 hex
//! digest: the generator binary, the template directory, the config file,
//! the injected HTML snippets, the static asset tree, the standalone about
//! page, and each individual post.
//!
//! ## File sets
//!
//! A directory is fingerprinted as a *set*: members are sorted by their
//! normalized relative path (forward slashes), then fed to one hasher as
//! alternating `path \0 content \0` segments. The result is therefore
//!
//! - independent of filesystem traversal order,
//! - sensitive to every byte of every member,
//! - sensitive to renames (the path is part of the digest).
//!
//! Fingerprints are content-based rather than mtime-based so they survive
//! `git checkout`, which resets modification times.
//!
//! An unreadable file is an error. A fingerprint that silently skipped a file
//! could report "unchanged" for content it never saw.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
#[error("Cannot fingerprint {path}: {source}")]
pub struct FingerprintError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FingerprintError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// SHA-256 of a byte slice, as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// SHA-256 of a UTF-8 string, as lowercase hex.
pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// SHA-256 of a file's contents, as lowercase hex.
pub fn hash_file(path: &Path) -> Result<String, FingerprintError> {
    let bytes = std::fs::read(path).map_err(|e| FingerprintError::new(path, e))?;
    Ok(hash_bytes(&bytes))
}

/// Hash an optional file: the empty string when it does not exist.
///
/// Used for inputs whose absence is itself a valid state (no config file,
/// no about page). A file that exists but cannot be read is still an error.
pub fn hash_optional_file(path: &Path) -> Result<String, FingerprintError> {
    if path.is_file() {
        hash_file(path)
    } else {
        Ok(String::new())
    }
}

/// All regular files below `root`, recursively. Empty when `root` is missing.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, FingerprintError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            FingerprintError::new(&path, io::Error::other(e))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Path of `path` relative to `base`, with `/` separators.
///
/// Falls back to the full path when `path` is not under `base`.
pub fn normalized_relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Fingerprint a set of files, keyed by their paths relative to `base`.
pub fn hash_paths(paths: &[PathBuf], base: &Path) -> Result<String, FingerprintError> {
    let mut members: Vec<(String, &PathBuf)> = paths
        .iter()
        .map(|p| (normalized_relative(p, base), p))
        .collect();
    members.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (rel, path) in members {
        let bytes = std::fs::read(path).map_err(|e| FingerprintError::new(path, e))?;
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
        hasher.update(&bytes);
        hasher.update(b"\0");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint every file under `dir`. The empty string when `dir` is missing.
pub fn hash_tree(dir: &Path, base: &Path) -> Result<String, FingerprintError> {
    if !dir.exists() {
        return Ok(String::new());
    }
    hash_paths(&list_files(dir)?, base)
}

/// Fingerprint of the running executable.
///
/// A rebuilt generator may render differently, so its bytes participate in
/// the "everything changed" check just like templates and config.
pub fn generator_fingerprint() -> Result<String, FingerprintError> {
    let exe = std::env::current_exe().map_err(|e| FingerprintError::new(Path::new("."), e))?;
    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_NAME").as_bytes());
    hasher.update(b"\0");
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"\0");
    let bytes = std::fs::read(&exe).map_err(|e| FingerprintError::new(&exe, e))?;
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// The cross-cutting fingerprints compared against the previous snapshot.
///
/// Per-post hashes are tracked separately because they drive selective
/// rebuilds rather than all-or-nothing decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprints {
    pub generator: String,
    pub templates: String,
    pub config: String,
    pub snippets: String,
    pub static_assets: String,
    pub about_page: String,
}

/// Fingerprint of the injected HTML snippets (analytics, widget, about panel).
///
/// Each part is NUL-terminated, so text moving between parts changes the hash.
pub fn hash_snippets(analytics: &str, widget: &str, about: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [analytics, widget, about] {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}
