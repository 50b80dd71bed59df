//! Stale output removal.
//!
//! After the post pages are written, pages that no longer belong to any
//! published post are deleted from `<output>/posts/`:
//!
//! - pages of posts whose source was removed,
//! - pages of posts that became drafts,
//! - pages left at a post's previous slug after its slug changed.
//!
//! A slug that is live in the current build is never deleted, even if it
//! also appears in one of the lists above (a new post may have taken over
//! the slug of a removed one).

use crate::lock::{BuildSnapshot, PostRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use tracing::debug;

/// Slugs whose pages are orphaned by this build.
pub fn orphaned_slugs(
    prior: &BuildSnapshot,
    current: &BTreeMap<String, PostRecord>,
    live: &BTreeSet<&str>,
) -> BTreeSet<String> {
    let mut orphaned = BTreeSet::new();
    for (path, before) in &prior.posts {
        if before.slug.is_empty() {
            continue;
        }
        let stale = match current.get(path) {
            None => true,
            Some(now) => (!before.draft && now.draft) || now.slug != before.slug,
        };
        if stale {
            orphaned.insert(before.slug.clone());
        }
    }
    orphaned.retain(|slug| !live.contains(slug.as_str()));
    orphaned
}

/// Delete `<posts_dir>/<slug>.html` for each slug. Missing files are fine.
///
/// Returns how many files were actually removed.
pub fn remove_outputs<'a>(
    posts_dir: &Path,
    slugs: impl IntoIterator<Item = &'a String>,
) -> io::Result<usize> {
    let mut removed = 0;
    for slug in slugs {
        let path = posts_dir.join(format!("{slug}.html"));
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale page");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LOCK_VERSION;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn record(slug: &str, draft: bool) -> PostRecord {
        PostRecord {
            hash: "h".into(),
            slug: slug.into(),
            explicit: false,
            draft,
            updated: None,
        }
    }

    fn records(items: &[(&str, &str, bool)]) -> BTreeMap<String, PostRecord> {
        items
            .iter()
            .map(|(path, slug, draft)| (path.to_string(), record(slug, *draft)))
            .collect()
    }

    fn snapshot(items: &[(&str, &str, bool)]) -> BuildSnapshot {
        BuildSnapshot {
            version: LOCK_VERSION,
            built_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            generator_hash: String::new(),
            templates_hash: String::new(),
            config_hash: String::new(),
            snippets_hash: String::new(),
            static_hash: String::new(),
            about_page_hash: String::new(),
            category_hash: String::new(),
            archive_hash: String::new(),
            posts: records(items),
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Orphan detection
    // =========================================================================

    #[test]
    fn removed_source_is_orphaned() {
        let prior = snapshot(&[("posts/a.md", "a", false), ("posts/b.md", "b", false)]);
        let current = records(&[("posts/a.md", "a", false)]);
        let live = BTreeSet::from(["a"]);
        assert_eq!(orphaned_slugs(&prior, &current, &live), set(&["b"]));
    }

    #[test]
    fn newly_drafted_is_orphaned() {
        let prior = snapshot(&[("posts/a.md", "a", false)]);
        let current = records(&[("posts/a.md", "a", true)]);
        assert_eq!(orphaned_slugs(&prior, &current, &BTreeSet::new()), set(&["a"]));
    }

    #[test]
    fn still_draft_is_not_orphaned() {
        let prior = snapshot(&[("posts/a.md", "a", true)]);
        let current = records(&[("posts/a.md", "a", true)]);
        assert!(orphaned_slugs(&prior, &current, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn previous_slug_is_orphaned_after_rename() {
        let prior = snapshot(&[("posts/a.md", "old", false)]);
        let current = records(&[("posts/a.md", "new", false)]);
        let live = BTreeSet::from(["new"]);
        assert_eq!(orphaned_slugs(&prior, &current, &live), set(&["old"]));
    }

    #[test]
    fn live_slug_is_never_orphaned() {
        // b.md was removed and a.md now owns its old slug.
        let prior = snapshot(&[("posts/a.md", "a", false), ("posts/b.md", "shared", false)]);
        let current = records(&[("posts/a.md", "shared", false)]);
        let live = BTreeSet::from(["shared"]);
        assert_eq!(orphaned_slugs(&prior, &current, &live), set(&["a"]));
    }

    #[test]
    fn unchanged_posts_are_kept() {
        let prior = snapshot(&[("posts/a.md", "a", false), ("posts/b.md", "b", false)]);
        let current = records(&[("posts/a.md", "a", false), ("posts/b.md", "b", false)]);
        let live = BTreeSet::from(["a", "b"]);
        assert!(orphaned_slugs(&prior, &current, &live).is_empty());
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    #[test]
    fn remove_outputs_deletes_and_counts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.html"), "a").unwrap();
        fs::write(tmp.path().join("keep.html"), "k").unwrap();

        let removed = remove_outputs(tmp.path(), &set(&["a", "missing"])).unwrap();
        assert_eq!(removed, 1);
        assert!(!tmp.path().join("a.html").exists());
        assert!(tmp.path().join("keep.html").exists());
    }

    #[test]
    fn remove_outputs_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.html"), "a").unwrap();
        let slugs = set(&["a"]);
        assert_eq!(remove_outputs(tmp.path(), &slugs).unwrap(), 1);
        assert_eq!(remove_outputs(tmp.path(), &slugs).unwrap(), 0);
    }
}
