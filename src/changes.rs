//! Change classification against the previous build.
//!
//! Pure functions: fresh fingerprints and the loaded snapshot go in, plain
//! values come out. Nothing here touches the disk, which keeps every
//! rebuild decision unit-testable.
//!
//! Two questions are answered:
//!
//! 1. **Which posts changed?** ([`classify`]) Posts are keyed by their
//!    project-relative path and partitioned into added, removed, and
//!    modified. The sets are disjoint by construction.
//! 2. **How much must be rebuilt?** ([`decide`]) A no-op skip, a full
//!    rebuild, or something in between.
//!
//! ## Staleness transitions
//!
//! Post pages show a "this post may be outdated" notice once the post's
//! `updated` date is older than the configured threshold. That notice depends
//! on the wall clock, not on any file, so an untouched post can need a
//! re-render. A transition is detected when a previously published post was
//! fresh at the previous build time but is stale now.

use crate::fingerprint::Fingerprints;
use crate::lock::BuildSnapshot;
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

/// Age threshold for the stale-post notice. `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StalenessPolicy {
    pub threshold: Option<Duration>,
}

impl StalenessPolicy {
    /// `0` days disables staleness entirely.
    pub fn from_days(days: u32) -> Self {
        Self {
            threshold: (days > 0).then(|| Duration::days(i64::from(days))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Whether a post last updated at `updated` is stale as of `at`.
    pub fn is_stale(&self, updated: NaiveDateTime, at: NaiveDateTime) -> bool {
        self.threshold.is_some_and(|t| at - updated > t)
    }
}

/// How the current set of posts differs from the previous build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    /// Some post crossed the staleness threshold since the previous build.
    pub staleness_changed: bool,
}

impl ChangeSet {
    /// Whether any post was added, removed, or edited.
    pub fn posts_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }

    /// Paths whose content must be re-rendered: added ∪ modified.
    pub fn touched(&self) -> BTreeSet<&str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Partition current post hashes against the previous snapshot.
///
/// `current` maps project-relative post path → content hash.
pub fn classify(
    current: &BTreeMap<String, String>,
    prior: Option<&BuildSnapshot>,
    policy: &StalenessPolicy,
    now: NaiveDateTime,
) -> ChangeSet {
    let empty = BTreeMap::new();
    let previous = prior.map(|p| &p.posts).unwrap_or(&empty);

    let mut changes = ChangeSet::default();
    for (path, hash) in current {
        match previous.get(path) {
            None => {
                changes.added.insert(path.clone());
            }
            Some(record) if record.hash != *hash => {
                changes.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }
    changes.removed = previous
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();
    changes.staleness_changed = staleness_transition(prior, policy, now);
    changes
}

/// Did any previously published post go from fresh to stale?
///
/// Without a prior snapshot there is nothing to compare against; an enabled
/// policy then reports a transition so the caller errs toward re-rendering.
pub fn staleness_transition(
    prior: Option<&BuildSnapshot>,
    policy: &StalenessPolicy,
    now: NaiveDateTime,
) -> bool {
    if !policy.is_enabled() {
        return false;
    }
    let Some(prior) = prior else {
        return true;
    };
    prior
        .posts
        .values()
        .filter(|record| !record.draft)
        .filter_map(|record| record.updated)
        .any(|updated| {
            let was_stale = policy.is_stale(updated, prior.built_at);
            let is_stale = policy.is_stale(updated, now);
            is_stale && !was_stale
        })
}

/// Everything [`decide`] needs besides the change set.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub fingerprints: &'a Fingerprints,
    pub prior: Option<&'a BuildSnapshot>,
    pub output_exists: bool,
    pub incremental: bool,
    pub clean_requested: bool,
}

/// Top-level rebuild triggers for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildDecision {
    /// Nothing changed: skip the build entirely.
    pub no_op: bool,
    /// Regenerate every artifact.
    pub full_rebuild: bool,
    /// Static assets need to be copied again.
    pub static_changed: bool,
    /// Post-derived artifacts (index, categories, feeds, …) need regeneration.
    pub aggregate_needed: bool,
    /// The standalone about page needs regeneration.
    pub about_changed: bool,
}

impl BuildDecision {
    /// Whether posts must be parsed at all this build.
    pub fn needs_content(&self) -> bool {
        self.aggregate_needed || self.about_changed
    }
}

/// Decide how much of the site to rebuild.
pub fn decide(inputs: &DecisionInputs<'_>, changes: &ChangeSet) -> BuildDecision {
    let current = inputs.fingerprints;
    let lock_ok = inputs.incremental && inputs.prior.is_some();
    let previous = inputs.prior.map(BuildSnapshot::fingerprints);

    let differs = |pick: fn(&Fingerprints) -> &String| match &previous {
        Some(prev) => pick(prev) != pick(current),
        None => true,
    };

    let core_changed = differs(|f| &f.generator)
        || differs(|f| &f.templates)
        || differs(|f| &f.config)
        || differs(|f| &f.snippets);
    let static_differs = differs(|f| &f.static_assets);
    let about_differs = differs(|f| &f.about_page);
    let posts_changed = changes.posts_changed();

    let no_op = lock_ok
        && inputs.output_exists
        && !core_changed
        && !static_differs
        && !about_differs
        && !posts_changed
        && !changes.staleness_changed;
    if no_op {
        return BuildDecision {
            no_op: true,
            ..Default::default()
        };
    }

    let full_rebuild =
        !lock_ok || !inputs.output_exists || core_changed || inputs.clean_requested;

    BuildDecision {
        no_op: false,
        full_rebuild,
        static_changed: full_rebuild || static_differs,
        aggregate_needed: full_rebuild || posts_changed || changes.staleness_changed,
        about_changed: full_rebuild || posts_changed || about_differs,
    }
}
