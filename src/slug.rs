//! Stable, collision-free slugs.
//!
//! A slug is a post's output filename stem (`posts/<slug>.html`), so it is
//! also its permalink. Resolution is a single sequential pass that threads a
//! set of claimed slugs through the documents in a fixed order:
//!
//! 1. Documents with an explicit `slug:` go first, sorted by source path.
//!    Each tries its normalized value, so explicit slugs win contention.
//! 2. The rest follow, also sorted by source path. A document reuses the
//!    slug it had in the previous build when that slug is still unclaimed
//!    and was not explicit then, which keeps permalinks stable when
//!    collisions shift around it. Dropping a `slug:` key therefore moves
//!    the post back to its filename.
//! 3. Otherwise the filename-derived candidate is used.
//!
//! A claimed candidate is disambiguated with a prefix of the SHA-256 of the
//! document's source path (8, 10, 12, then 16 hex characters), then with a
//! numeric suffix starting at 2. Identical inputs therefore always produce
//! identical slugs.
//!
//! Drafts take part too. A draft keeps its slug in the lock file so it
//! publishes under the same permalink later.

use crate::fingerprint::hash_text;
use crate::lock::BuildSnapshot;
use crate::types::{ContentDocument, PostMeta};
use std::collections::{BTreeMap, BTreeSet};

const HASH_PREFIX_LENGTHS: [usize; 4] = [8, 10, 12, 16];

/// Resolved slug per source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugAssignment {
    slugs: BTreeMap<String, String>,
}

impl SlugAssignment {
    pub fn get(&self, source: &str) -> Option<&str> {
        self.slugs.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slugs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Assign a unique slug to every document.
pub fn resolve_slugs(docs: &[ContentDocument], prior: Option<&BuildSnapshot>) -> SlugAssignment {
    let mut order: Vec<&PostMeta> = docs.iter().map(ContentDocument::meta).collect();
    order.sort_by(|a, b| {
        (a.explicit_slug.is_none(), &a.source).cmp(&(b.explicit_slug.is_none(), &b.source))
    });

    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut slugs = BTreeMap::new();
    for meta in order {
        let previous = match meta.explicit_slug {
            Some(_) => None,
            None => prior
                .and_then(|p| p.posts.get(&meta.source))
                .filter(|record| !record.explicit)
                .map(|record| record.slug.as_str())
                .filter(|slug| !slug.is_empty()),
        };
        let slug = match previous {
            Some(prev) if !claimed.contains(prev) => prev.to_string(),
            _ => disambiguate(meta.candidate_slug(), &meta.source, &claimed),
        };
        claimed.insert(slug.clone());
        slugs.insert(meta.source.clone(), slug);
    }
    SlugAssignment { slugs }
}

/// `candidate` if free, else a hash-suffixed or numbered variant of it.
fn disambiguate(candidate: &str, source: &str, claimed: &BTreeSet<String>) -> String {
    if !claimed.contains(candidate) {
        return candidate.to_string();
    }
    let digest = hash_text(source);
    for len in HASH_PREFIX_LENGTHS {
        let slug = format!("{candidate}-{}", &digest[..len]);
        if !claimed.contains(&slug) {
            return slug;
        }
    }
    let mut counter = 2u32;
    loop {
        let slug = format!("{candidate}-{counter}");
        if !claimed.contains(&slug) {
            return slug;
        }
        counter += 1;
    }
}
