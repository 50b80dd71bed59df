//! # Simple Blog
//!
//! A static blog generator for a folder of Markdown posts. Each post becomes
//! a page, and the collection also feeds an index, category pages, an archive,
//! search, and feeds. Its distinguishing feature is the incremental build: a
//! lock file records what the previous build consumed, and the next build
//! regenerates only what those inputs invalidate.
//!
//! # Architecture: One Build, Six Decisions
//!
//! ```text
//! 1. Fingerprint  templates, config, snippets, static, about, posts → SHA-256
//! 2. Classify     posts vs. lock file → added / removed / modified, staleness
//! 3. Decide       skip, full rebuild, or partial
//! 4. Parse        posts → documents (worker pool), then slugs (sequential)
//! 5. Plan         one action per artifact family: skip, full, selective
//! 6. Write        render (worker pool), remove orphans, save the lock file
//! ```
//!
//! Steps 1 to 3 and 5 are pure functions over plain values, so the rebuild
//! policy is unit-tested without a filesystem. [`builder`] sequences them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fingerprint`] | Content hashes of files and file sets |
//! | [`lock`] | The persisted [`lock::BuildSnapshot`] and its load/save rules |
//! | [`changes`] | Change classification, staleness transitions, top-level decision |
//! | [`content`] | Front matter, dates, categories, summaries, word counts |
//! | [`markdown`] | The [`markdown::MarkdownConverter`] seam and its pulldown-cmark implementation |
//! | [`pipeline`] | Source discovery and parallel parsing into [`types::ContentDocument`]s |
//! | [`slug`] | Stable, collision-free slug assignment |
//! | [`plan`] | Per-artifact rebuild actions and aggregate signatures |
//! | [`pages`] | HTML, JSON, and XML generation with Maud |
//! | [`reconcile`] | Removal of orphaned post pages |
//! | [`builder`] | Orchestration of one build, plus `check` |
//! | [`config`] | `site.toml` loading, validation, and injected snippets |
//! | [`types`] | Shared document and post types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Hashes, Not Timestamps
//!
//! Every change check compares SHA-256 digests. Modification times are reset
//! by `git checkout` and by most deploy pipelines, so an mtime-based build
//! would either miss edits or rebuild everything after every clone.
//!
//! ## Conservative Invalidation
//!
//! Post pages carry sidebars listing categories and sibling archive entries.
//! Rather than tracking exactly which sidebar mentions which post, any change
//! to the category or archive signature re-renders every post page. A body
//! edit that leaves both signatures intact re-renders only that post.
//!
//! ## Slugs Are Sticky
//!
//! A post keeps the slug it was first given for as long as its source path
//! exists, even when a later collision would have given it a different one.
//! Permalinks only move when the author adds, changes, or removes an explicit
//! `slug:`. The lock file remembers which slugs were explicit, so removing
//! the key sends the post back to its filename.
//!
//! ## The Lock File Is Written Last
//!
//! A build that fails part-way leaves the previous snapshot in place, so the
//! next run sees the same changes again and retries them.

pub mod builder;
pub mod changes;
pub mod config;
pub mod content;
pub mod fingerprint;
pub mod lock;
pub mod markdown;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod slug;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
