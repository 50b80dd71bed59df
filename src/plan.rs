//! Per-artifact rebuild planning.
//!
//! Turns the top-level [`BuildDecision`] into one [`Action`] per artifact
//! family. The policy is deliberately coarse:
//!
//! | Family                                    | Regenerated when                         |
//! |-------------------------------------------|------------------------------------------|
//! | index, categories, search, archive, feeds, sitemap, 404 | any post changed, staleness flipped, or full rebuild |
//! | post pages                                | full if the above plus an aggregate signature changed; else only changed slugs |
//! | about page                                | its source changed, any post changed, or full rebuild |
//! | static assets                             | static tree changed or full rebuild      |
//!
//! Post pages embed sidebars listing categories and sibling archive entries,
//! so a change to either aggregate signature makes every post page stale.
//! Otherwise only the posts that were added, edited, or moved to a new slug
//! are rendered again.

use crate::changes::{BuildDecision, ChangeSet};
use crate::fingerprint::hash_text;
use crate::lock::BuildSnapshot;
use crate::types::Post;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What to do with one artifact family.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Skip,
    Full,
    /// Regenerate only the listed slugs.
    Selective(BTreeSet<String>),
}

impl Action {
    fn when(condition: bool) -> Self {
        if condition { Self::Full } else { Self::Skip }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Whether the artifact for `slug` is regenerated.
    pub fn includes(&self, slug: &str) -> bool {
        match self {
            Self::Skip => false,
            Self::Full => true,
            Self::Selective(slugs) => slugs.contains(slug),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Full => write!(f, "full"),
            Self::Selective(slugs) => write!(f, "selective ({})", slugs.len()),
        }
    }
}

/// Hashes of the cross-post state that per-post pages depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signatures {
    pub category: String,
    pub archive: String,
}

impl Signatures {
    pub fn compute(posts: &[Post]) -> Self {
        Self {
            category: category_signature(posts),
            archive: archive_signature(posts),
        }
    }

    /// The signatures recorded by a previous build.
    pub fn from_snapshot(snapshot: &BuildSnapshot) -> Self {
        Self {
            category: snapshot.category_hash.clone(),
            archive: snapshot.archive_hash.clone(),
        }
    }
}

/// Hash of `name:count` pairs, ordered case-insensitively by name.
pub fn category_signature(posts: &[Post]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for post in posts {
        for category in &post.meta.categories {
            *counts.entry(category.as_str()).or_default() += 1;
        }
    }
    let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()).then(a.0.cmp(b.0)));
    let parts: Vec<String> = entries
        .iter()
        .map(|(name, count)| format!("{name}:{count}"))
        .collect();
    hash_text(&parts.join("|"))
}

/// Hash of each archive label's members.
///
/// A member is `slug/title/date` rather than the bare slug, because the
/// archive sidebar on sibling pages shows titles and dates too.
pub fn archive_signature(posts: &[Post]) -> String {
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for post in posts {
        for label in &post.meta.archives {
            groups.entry(label.as_str()).or_default().push(format!(
                "{}/{}/{}",
                post.slug,
                post.meta.title,
                post.meta.date.display()
            ));
        }
    }
    let parts: Vec<String> = groups
        .into_iter()
        .map(|(label, mut members)| {
            members.sort();
            format!("{label}:{}", members.join(","))
        })
        .collect();
    hash_text(&parts.join("|"))
}

/// Slugs of published posts that must be rendered even in a selective build.
///
/// That is every post that was added or edited, plus any post whose slug
/// moved or that was a draft in the previous build.
pub fn changed_slugs(
    posts: &[Post],
    changes: &ChangeSet,
    prior: Option<&BuildSnapshot>,
) -> BTreeSet<String> {
    let touched = changes.touched();
    posts
        .iter()
        .filter(|post| {
            let record = prior.and_then(|p| p.posts.get(&post.meta.source));
            touched.contains(post.meta.source.as_str())
                || record.is_none_or(|r| r.draft || r.slug != post.slug)
        })
        .map(|post| post.slug.clone())
        .collect()
}

/// Per-family actions for one build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebuildPlan {
    pub index: Action,
    pub posts: Action,
    pub categories: Action,
    pub search: Action,
    pub archive: Action,
    pub feeds: Action,
    pub sitemap: Action,
    pub not_found: Action,
    pub about: Action,
    pub static_assets: Action,
}

impl RebuildPlan {
    /// `(family, action)` pairs in display order.
    pub fn families(&self) -> [(&'static str, &Action); 10] {
        [
            ("index", &self.index),
            ("posts", &self.posts),
            ("categories", &self.categories),
            ("search", &self.search),
            ("archive", &self.archive),
            ("feeds", &self.feeds),
            ("sitemap", &self.sitemap),
            ("404", &self.not_found),
            ("about", &self.about),
            ("static", &self.static_assets),
        ]
    }
}

/// Plan the build.
///
/// `previous` holds the aggregate signatures of the last build, `None` when
/// there was none.
pub fn plan(
    decision: &BuildDecision,
    changes: &ChangeSet,
    current: &Signatures,
    previous: Option<&Signatures>,
    changed: BTreeSet<String>,
) -> RebuildPlan {
    let aggregate = decision.aggregate_needed;
    let signatures_changed = previous.is_none_or(|p| p != current);

    let posts = if !aggregate {
        Action::Skip
    } else if decision.full_rebuild || changes.staleness_changed || signatures_changed {
        Action::Full
    } else if changed.is_empty() {
        Action::Skip
    } else {
        Action::Selective(changed)
    };

    RebuildPlan {
        index: Action::when(aggregate),
        posts,
        categories: Action::when(aggregate),
        search: Action::when(aggregate),
        archive: Action::when(aggregate),
        feeds: Action::when(aggregate),
        sitemap: Action::when(aggregate),
        not_found: Action::when(aggregate),
        about: Action::when(decision.about_changed),
        static_assets: Action::when(decision.static_changed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PostDate;
    use crate::lock::{LOCK_VERSION, PostRecord};
    use crate::types::{PostMeta, RenderedBody};
    use chrono::NaiveDate;

    fn post(source: &str, slug: &str, categories: &[&str], archives: &[&str]) -> Post {
        let date = PostDate {
            value: NaiveDate::from_ymd_opt(2026, 1, 10)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            has_time: false,
        };
        Post {
            slug: slug.into(),
            meta: PostMeta {
                source: source.into(),
                hash: String::new(),
                title: slug.to_uppercase(),
                date,
                updated: date,
                categories: categories.iter().map(|c| c.to_string()).collect(),
                archives: archives.iter().map(|a| a.to_string()).collect(),
                explicit_slug: None,
                stem_slug: slug.into(),
            },
            body: RenderedBody::default(),
        }
    }

    fn snapshot(records: &[(&str, &str, bool)]) -> BuildSnapshot {
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
            posts: records
                .iter()
                .map(|(path, slug, draft)| {
                    (
                        path.to_string(),
                        PostRecord {
                            hash: String::new(),
                            slug: slug.to_string(),
                            explicit: false,
                            draft: *draft,
                            updated: None,
                        },
                    )
                })
                .collect(),
        }
    }

    fn incremental() -> BuildDecision {
        BuildDecision {
            no_op: false,
            full_rebuild: false,
            static_changed: false,
            aggregate_needed: true,
            about_changed: true,
        }
    }

    fn slugs(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    #[test]
    fn category_signature_counts_and_orders() {
        let a = vec![post("a", "a", &["Rust", "go"], &[]), post("b", "b", &["rust"], &[])];
        let b = vec![post("b", "b", &["rust"], &[]), post("a", "a", &["go", "Rust"], &[])];
        assert_eq!(category_signature(&a), category_signature(&b));

        let c = vec![post("a", "a", &["Rust"], &[]), post("b", "b", &["rust"], &[])];
        assert_ne!(category_signature(&a), category_signature(&c));
    }

    #[test]
    fn category_signature_ignores_content_edits() {
        let mut edited = post("a", "a", &["Rust"], &[]);
        let original = vec![edited.clone()];
        edited.body.html = "<p>changed</p>".into();
        assert_eq!(category_signature(&original), category_signature(&[edited]));
    }

    #[test]
    fn archive_signature_tracks_membership() {
        let base = vec![post("a", "a", &[], &["Series"]), post("b", "b", &[], &["Series"])];
        let reordered = vec![post("b", "b", &[], &["Series"]), post("a", "a", &[], &["Series"])];
        assert_eq!(archive_signature(&base), archive_signature(&reordered));

        let fewer = vec![post("a", "a", &[], &["Series"])];
        assert_ne!(archive_signature(&base), archive_signature(&fewer));
    }

    #[test]
    fn archive_signature_tracks_member_titles() {
        let base = vec![post("a", "a", &[], &["Series"])];
        let mut renamed = base.clone();
        renamed[0].meta.title = "Renamed".into();
        assert_ne!(archive_signature(&base), archive_signature(&renamed));
    }

    // =========================================================================
    // Changed slugs
    // =========================================================================

    #[test]
    fn changed_slugs_from_touched_sources() {
        let posts = vec![post("posts/a.md", "a", &[], &[]), post("posts/b.md", "b", &[], &[])];
        let prior = snapshot(&[("posts/a.md", "a", false), ("posts/b.md", "b", false)]);
        let changes = ChangeSet {
            modified: slugs(&["posts/a.md"]),
            ..Default::default()
        };
        assert_eq!(changed_slugs(&posts, &changes, Some(&prior)), slugs(&["a"]));
    }

    #[test]
    fn changed_slugs_include_moved_and_published_drafts() {
        let posts = vec![
            post("posts/a.md", "a-new", &[], &[]),
            post("posts/b.md", "b", &[], &[]),
            post("posts/c.md", "c", &[], &[]),
        ];
        let prior = snapshot(&[
            ("posts/a.md", "a", false),
            ("posts/b.md", "b", true),
            ("posts/c.md", "c", false),
        ]);
        let changed = changed_slugs(&posts, &ChangeSet::default(), Some(&prior));
        assert_eq!(changed, slugs(&["a-new", "b"]));
    }

    #[test]
    fn changed_slugs_without_prior_is_everything() {
        let posts = vec![post("posts/a.md", "a", &[], &[])];
        assert_eq!(changed_slugs(&posts, &ChangeSet::default(), None), slugs(&["a"]));
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn selective_when_signatures_unchanged() {
        let sigs = Signatures {
            category: "c".into(),
            archive: "a".into(),
        };
        let changes = ChangeSet {
            modified: slugs(&["posts/a.md"]),
            ..Default::default()
        };
        let plan = plan(&incremental(), &changes, &sigs, Some(&sigs.clone()), slugs(&["a"]));
        assert_eq!(plan.posts, Action::Selective(slugs(&["a"])));
        assert_eq!(plan.index, Action::Full);
        assert_eq!(plan.feeds, Action::Full);
        assert_eq!(plan.static_assets, Action::Skip);
        assert!(plan.posts.includes("a"));
        assert!(!plan.posts.includes("b"));
    }

    #[test]
    fn full_posts_when_category_signature_changes() {
        let current = Signatures {
            category: "c2".into(),
            archive: "a".into(),
        };
        let previous = Signatures {
            category: "c1".into(),
            archive: "a".into(),
        };
        let plan = plan(
            &incremental(),
            &ChangeSet::default(),
            &current,
            Some(&previous),
            slugs(&["a"]),
        );
        assert_eq!(plan.posts, Action::Full);
    }

    #[test]
    fn full_posts_on_staleness_transition() {
        let sigs = Signatures::default();
        let changes = ChangeSet {
            staleness_changed: true,
            ..Default::default()
        };
        let plan = plan(&incremental(), &changes, &sigs, Some(&sigs.clone()), BTreeSet::new());
        assert_eq!(plan.posts, Action::Full);
    }

    #[test]
    fn full_posts_without_previous_signatures() {
        let plan = plan(
            &incremental(),
            &ChangeSet::default(),
            &Signatures::default(),
            None,
            BTreeSet::new(),
        );
        assert_eq!(plan.posts, Action::Full);
    }

    #[test]
    fn nothing_changed_for_posts_skips_them() {
        let sigs = Signatures::default();
        let plan = plan(&incremental(), &ChangeSet::default(), &sigs, Some(&sigs.clone()), BTreeSet::new());
        assert_eq!(plan.posts, Action::Skip);
    }

    #[test]
    fn static_only_change_skips_content_families() {
        let decision = BuildDecision {
            static_changed: true,
            ..Default::default()
        };
        let sigs = Signatures::default();
        let plan = plan(&decision, &ChangeSet::default(), &sigs, Some(&sigs.clone()), BTreeSet::new());
        assert_eq!(plan.static_assets, Action::Full);
        for (family, action) in plan.families() {
            if family != "static" {
                assert!(action.is_skip(), "{family} should be skipped");
            }
        }
    }

    #[test]
    fn full_rebuild_regenerates_everything() {
        let decision = BuildDecision {
            full_rebuild: true,
            static_changed: true,
            aggregate_needed: true,
            about_changed: true,
            ..Default::default()
        };
        let sigs = Signatures::default();
        let plan = plan(&decision, &ChangeSet::default(), &sigs, Some(&sigs.clone()), BTreeSet::new());
        assert!(plan.families().iter().all(|(_, a)| **a == Action::Full));
    }

    #[test]
    fn action_display() {
        assert_eq!(Action::Skip.to_string(), "skip");
        assert_eq!(Action::Full.to_string(), "full");
        assert_eq!(Action::Selective(slugs(&["a", "b"])).to_string(), "selective (2)");
    }
}
