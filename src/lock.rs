//! Persisted build state (the lock file).
//!
//! The lock file records what the previous successful build consumed: the
//! cross-cutting fingerprints, the aggregate signatures, and one record per
//! post. The next build diffs against it to decide what to regenerate.
//!
//! ## Format
//!
//! Pretty-printed JSON, by default `build.lock.json` next to the config file:
//!
//! ```json
//! {
//!   "version": 2,
//!   "built_at": "2026-01-10T09:30:00",
//!   "generator_hash": "…",
//!   "templates_hash": "…",
//!   "config_hash": "…",
//!   "snippets_hash": "…",
//!   "static_hash": "…",
//!   "about_page_hash": "",
//!   "category_hash": "…",
//!   "archive_hash": "…",
//!   "posts": {
//!     "posts/hello.md": {
//!       "hash": "…",
//!       "slug": "hello",
//!       "explicit": false,
//!       "draft": false,
//!       "updated": "2026-01-09T18:00:00"
//!     }
//!   }
//! }
//! ```
//!
//! ## Degradation
//!
//! Loading never fails. A missing file, unparsable JSON, or a `version` other
//! than [`LOCK_VERSION`] all load as `None`, which the change classifier
//! treats as "no prior build" and answers with a full rebuild.
//!
//! ## Writes
//!
//! The snapshot is written wholesale to `<lock>.tmp` and renamed over the old
//! file, so a reader sees either the previous snapshot or the new one. The
//! build writes it last, after every output file has been written.

use crate::fingerprint::Fingerprints;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Version of the lock file schema. Bump to force a full rebuild everywhere
/// when the format or any fingerprint construction changes.
pub const LOCK_VERSION: u32 = 2;

/// What the previous build recorded about one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub hash: String,
    #[serde(default)]
    pub slug: String,
    /// Whether `slug` came from a `slug:` front-matter key.
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDateTime>,
}

/// The full persisted snapshot of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    pub version: u32,
    pub built_at: NaiveDateTime,
    #[serde(default)]
    pub generator_hash: String,
    #[serde(default)]
    pub templates_hash: String,
    #[serde(default)]
    pub config_hash: String,
    #[serde(default)]
    pub snippets_hash: String,
    #[serde(default)]
    pub static_hash: String,
    #[serde(default)]
    pub about_page_hash: String,
    #[serde(default)]
    pub category_hash: String,
    #[serde(default)]
    pub archive_hash: String,
    #[serde(default)]
    pub posts: BTreeMap<String, PostRecord>,
}

impl BuildSnapshot {
    /// Assemble a snapshot for the current build.
    pub fn new(
        built_at: NaiveDateTime,
        fingerprints: &Fingerprints,
        category_hash: String,
        archive_hash: String,
        posts: BTreeMap<String, PostRecord>,
    ) -> Self {
        Self {
            version: LOCK_VERSION,
            built_at,
            generator_hash: fingerprints.generator.clone(),
            templates_hash: fingerprints.templates.clone(),
            config_hash: fingerprints.config.clone(),
            snippets_hash: fingerprints.snippets.clone(),
            static_hash: fingerprints.static_assets.clone(),
            about_page_hash: fingerprints.about_page.clone(),
            category_hash,
            archive_hash,
            posts,
        }
    }

    /// The fingerprints this snapshot was built from.
    pub fn fingerprints(&self) -> Fingerprints {
        Fingerprints {
            generator: self.generator_hash.clone(),
            templates: self.templates_hash.clone(),
            config: self.config_hash.clone(),
            snippets: self.snippets_hash.clone(),
            static_assets: self.static_hash.clone(),
            about_page: self.about_page_hash.clone(),
        }
    }
}

/// Reads and writes the snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot, or `None` if it is absent or unusable.
    pub fn load(&self) -> Option<BuildSnapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no lock file");
                return None;
            }
        };
        let snapshot: BuildSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed lock file");
                return None;
            }
        };
        if snapshot.version != LOCK_VERSION {
            warn!(
                found = snapshot.version,
                expected = LOCK_VERSION,
                "ignoring lock file with a different version"
            );
            return None;
        }
        Some(snapshot)
    }

    /// Persist `snapshot`, replacing any previous one.
    pub fn save(&self, snapshot: &BuildSnapshot) -> io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), posts = snapshot.posts.len(), "lock file written");
        Ok(())
    }
}
