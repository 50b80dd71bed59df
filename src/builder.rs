//! Incremental build orchestration.
//!
//! One call to [`build_site`] runs the whole pipeline:
//!
//! ```text
//! fingerprint ─► classify ─► decide ──► (no-op: return Skipped)
//!                              │
//!                              ▼
//!            parse (pool) ─► resolve slugs ─► plan
//!                                              │
//!                                              ▼
//!                    render (pool) ─► reconcile ─► save snapshot
//! ```
//!
//! The previous snapshot goes in as a value loaded from the lock file and the
//! new one comes out as a value written back at the very end. Nothing in
//! between reads or writes global state, and the lock file is only replaced
//! after every output write succeeded, so a failed build leaves the previous
//! snapshot authoritative.
//!
//! When the decision says the post collection is untouched (only static
//! assets changed), posts are not parsed at all: the previous records and
//! aggregate signatures carry forward into the new snapshot.

use crate::changes::{
    BuildDecision, ChangeSet, DecisionInputs, StalenessPolicy, classify, decide,
};
use crate::config::{self, CONFIG_FILENAME, ConfigError, SiteConfig, Snippets};
use crate::fingerprint::{self, FingerprintError, Fingerprints};
use crate::lock::{BuildSnapshot, LockStore, PostRecord};
use crate::markdown::{CmarkConverter, MarkdownConverter};
use crate::pages::{self, RenderError, Site};
use crate::pipeline::{self, ParseError, SourceFile};
use crate::plan::{self, RebuildPlan, Signatures};
use crate::reconcile;
use crate::slug::resolve_slugs;
use crate::types::{ContentDocument, Post};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Required directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Base template not found: {0}")]
    MissingTemplate(PathBuf),
    #[error("Refusing to clean {0}: it must be a subdirectory of the project that holds no sources")]
    UnsafeClean(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Inputs of one build invocation.
///
/// `now` and `generator_hash` are supplied by the caller so builds are
/// reproducible under test. The optional fields override `site.toml`.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root. Relative paths in the config resolve against it.
    pub root: PathBuf,
    /// Path to `site.toml`. A missing file means all defaults.
    pub config_path: PathBuf,
    pub generator_hash: String,
    pub now: NaiveDateTime,
    /// Remove the output directory before a full rebuild.
    pub clean: bool,
    pub incremental: Option<bool>,
    pub workers: Option<usize>,
    pub output: Option<PathBuf>,
}

impl BuildOptions {
    pub fn new(root: impl Into<PathBuf>, generator_hash: impl Into<String>, now: NaiveDateTime) -> Self {
        let root = root.into();
        Self {
            config_path: root.join(CONFIG_FILENAME),
            root,
            generator_hash: generator_hash.into(),
            now,
            clean: false,
            incremental: None,
            workers: None,
            output: None,
        }
    }
}

/// Resolved project paths.
#[derive(Debug, Clone)]
struct Layout {
    root: PathBuf,
    config_dir: PathBuf,
    posts: PathBuf,
    templates: PathBuf,
    base_template: PathBuf,
    static_dir: PathBuf,
    about: PathBuf,
    output: PathBuf,
    lock: PathBuf,
}

impl Layout {
    fn resolve(opts: &BuildOptions, config: &SiteConfig) -> Self {
        let root = opts.root.clone();
        let config_dir = opts
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.clone());
        let templates = root.join(&config.templates);
        Self {
            posts: root.join(&config.posts),
            base_template: templates.join("base.html"),
            templates,
            static_dir: root.join(&config.static_dir),
            about: root.join(&config.pages).join("about.md"),
            output: root.join(opts.output.as_ref().unwrap_or(&config.output)),
            lock: config_dir.join(&config.lock_file),
            config_dir,
            root,
        }
    }

    /// Fail before touching the output when an input directory is missing.
    fn validate(&self) -> Result<(), BuildError> {
        for dir in [&self.posts, &self.templates] {
            if !dir.is_dir() {
                return Err(BuildError::MissingDirectory(dir.clone()));
            }
        }
        if !self.base_template.is_file() {
            return Err(BuildError::MissingTemplate(self.base_template.clone()));
        }
        Ok(())
    }
}

/// Everything known before any output is written.
struct Prepared {
    config: SiteConfig,
    layout: Layout,
    snippets: Snippets,
    fingerprints: Fingerprints,
    sources: Vec<SourceFile>,
    prior: Option<BuildSnapshot>,
    changes: ChangeSet,
    decision: BuildDecision,
    output_existed: bool,
    clean: bool,
}

fn prepare(opts: &BuildOptions) -> Result<Prepared, BuildError> {
    let mut config = config::load_config(&opts.config_path)?;
    if let Some(workers) = opts.workers {
        config.build_workers = workers;
    }
    let layout = Layout::resolve(opts, &config);
    layout.validate()?;

    let snippets = Snippets::resolve(&config, &layout.config_dir)?;
    let fingerprints = Fingerprints {
        generator: opts.generator_hash.clone(),
        templates: fingerprint::hash_tree(&layout.templates, &layout.root)?,
        config: fingerprint::hash_optional_file(&opts.config_path)?,
        snippets: fingerprint::hash_snippets(&snippets.analytics, &snippets.widget, &snippets.about),
        static_assets: fingerprint::hash_tree(&layout.static_dir, &layout.root)?,
        about_page: fingerprint::hash_optional_file(&layout.about)?,
    };

    let sources = pipeline::discover_posts(&layout.posts, &layout.root)?;
    let current: BTreeMap<String, String> = sources
        .iter()
        .map(|s| (s.rel.clone(), s.hash.clone()))
        .collect();
    debug!(posts = sources.len(), "discovered sources");

    let incremental = opts.incremental.unwrap_or(config.incremental);
    let prior = if incremental {
        LockStore::new(&layout.lock).load()
    } else {
        None
    };
    let policy = StalenessPolicy::from_days(config.stale_days);
    let changes = classify(&current, prior.as_ref(), &policy, opts.now);

    let output_existed = layout.output.is_dir();
    let clean = opts.clean || config.clean;
    let decision = decide(
        &DecisionInputs {
            fingerprints: &fingerprints,
            prior: prior.as_ref(),
            output_exists: output_existed,
            incremental,
            clean_requested: clean,
        },
        &changes,
    );
    debug!(?decision, "build decision");

    Ok(Prepared {
        config,
        layout,
        snippets,
        fingerprints,
        sources,
        prior,
        changes,
        decision,
        output_existed,
        clean,
    })
}

/// Summary of a completed (non-skipped) build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub output: PathBuf,
    pub full_rebuild: bool,
    pub cleaned: bool,
    pub workers: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub staleness_changed: bool,
    /// Posts parsed this build. Zero when the post collection was untouched.
    pub parsed: usize,
    pub published: usize,
    pub drafts: usize,
    pub plan: RebuildPlan,
    pub files_written: usize,
    pub pages_removed: usize,
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Nothing changed since the previous build. Nothing was written.
    Skipped,
    Built(BuildReport),
}

/// Build the site with the pulldown-cmark converter.
pub fn build_site(opts: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    build_site_with(opts, &CmarkConverter)
}

/// Build the site with a specific Markdown converter (allows testing with a mock).
pub fn build_site_with(
    opts: &BuildOptions,
    converter: &impl MarkdownConverter,
) -> Result<BuildOutcome, BuildError> {
    let Prepared {
        config,
        layout,
        snippets,
        fingerprints,
        sources,
        prior,
        changes,
        decision,
        output_existed,
        clean,
    } = prepare(opts)?;

    if decision.no_op {
        info!("no changes detected, build skipped");
        return Ok(BuildOutcome::Skipped);
    }

    let mut report = BuildReport {
        output: layout.output.clone(),
        full_rebuild: decision.full_rebuild,
        workers: config::effective_workers(&config),
        added: changes.added.len(),
        removed: changes.removed.len(),
        modified: changes.modified.len(),
        staleness_changed: changes.staleness_changed,
        ..Default::default()
    };

    if decision.full_rebuild && clean {
        report.cleaned = clean_output_dir(&layout)?;
    }
    fs::create_dir_all(&layout.output).map_err(io_error(&layout.output))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(report.workers)
        .build()?;
    let depth = config.toc_depth()?;

    // Content stage.
    let (records, signatures, posts) = if decision.needs_content() {
        info!(posts = sources.len(), workers = report.workers, "parsing posts");
        let docs = pipeline::parse_all(&sources, converter, depth, &pool)?;
        report.parsed = docs.len();
        let (records, posts) = assemble(docs, prior.as_ref());
        let signatures = Signatures::compute(&posts);
        (records, signatures, posts)
    } else {
        debug!("post collection unchanged, carrying records forward");
        let records = prior.as_ref().map(|p| p.posts.clone()).unwrap_or_default();
        let signatures = prior
            .as_ref()
            .map(Signatures::from_snapshot)
            .unwrap_or_default();
        (records, signatures, Vec::new())
    };
    report.published = records.values().filter(|r| !r.draft).count();
    report.drafts = records.values().filter(|r| r.draft).count();

    let previous = prior.as_ref().map(Signatures::from_snapshot);
    let changed = plan::changed_slugs(&posts, &changes, prior.as_ref());
    let rebuild = plan::plan(&decision, &changes, &signatures, previous.as_ref(), changed);
    for (family, action) in rebuild.families() {
        debug!(family, %action, "planned");
    }

    // Render stage.
    report.files_written = render(&RenderInputs {
        config: &config,
        layout: &layout,
        snippets: &snippets,
        now: opts.now,
        posts: &posts,
        plan: &rebuild,
        converter,
        pool: &pool,
    })?;

    // Reconcile only when the aggregate stage ran against an existing tree.
    if output_existed
        && !report.cleaned
        && decision.aggregate_needed
        && let Some(prior) = prior.as_ref()
    {
        let live: BTreeSet<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        let orphaned = reconcile::orphaned_slugs(prior, &records, &live);
        let posts_dir = layout.output.join("posts");
        report.pages_removed =
            reconcile::remove_outputs(&posts_dir, &orphaned).map_err(io_error(&posts_dir))?;
        if report.pages_removed > 0 {
            info!(removed = report.pages_removed, "removed stale post pages");
        }
    }

    let snapshot = BuildSnapshot::new(
        opts.now,
        &fingerprints,
        signatures.category,
        signatures.archive,
        records,
    );
    let store = LockStore::new(&layout.lock);
    store.save(&snapshot).map_err(io_error(store.path()))?;

    report.plan = rebuild;
    info!(files = report.files_written, output = %layout.output.display(), "build complete");
    Ok(BuildOutcome::Built(report))
}

/// Lock records for every document, and the published posts newest first.
fn assemble(
    docs: Vec<ContentDocument>,
    prior: Option<&BuildSnapshot>,
) -> (BTreeMap<String, PostRecord>, Vec<Post>) {
    let slugs = resolve_slugs(&docs, prior);
    let mut records = BTreeMap::new();
    let mut posts = Vec::new();
    for doc in docs {
        let meta = doc.meta();
        let slug = slugs.get(&meta.source).unwrap_or(meta.candidate_slug()).to_string();
        records.insert(
            meta.source.clone(),
            PostRecord {
                hash: meta.hash.clone(),
                slug: slug.clone(),
                explicit: meta.explicit_slug.is_some(),
                draft: doc.is_draft(),
                updated: Some(meta.updated.value),
            },
        );
        match doc {
            ContentDocument::Published { meta, body } => posts.push(Post { slug, meta, body }),
            ContentDocument::Draft { meta } => debug!(source = %meta.source, "skipping draft"),
        }
    }
    posts.sort_by(|a, b| {
        b.meta
            .date
            .value
            .cmp(&a.meta.date.value)
            .then_with(|| a.meta.source.cmp(&b.meta.source))
    });
    (records, posts)
}

struct RenderInputs<'a, C> {
    config: &'a SiteConfig,
    layout: &'a Layout,
    snippets: &'a Snippets,
    now: NaiveDateTime,
    posts: &'a [Post],
    plan: &'a RebuildPlan,
    converter: &'a C,
    pool: &'a rayon::ThreadPool,
}

/// Write every artifact the plan asks for. Returns the number of files written.
fn render<C: MarkdownConverter>(inputs: &RenderInputs<'_, C>) -> Result<usize, BuildError> {
    let RenderInputs {
        config,
        layout,
        snippets,
        now,
        posts,
        plan,
        converter,
        pool,
    } = inputs;
    let output = layout.output.as_path();
    let mut written = 0;

    if !plan.static_assets.is_skip() {
        let copied = pages::copy_static(&layout.static_dir, output)?;
        debug!(files = copied, "copied static assets");
        written += copied;
    }
    written += pages::write_site_files(config, output)?;

    let template =
        fs::read_to_string(&layout.base_template).map_err(io_error(&layout.base_template))?;
    let site = Site::new(config, snippets, &template, output, *now, posts);

    let mut index_pages = 0;
    if !plan.index.is_skip() {
        index_pages = site.write_index()?;
        written += index_pages;
    }
    if !plan.posts.is_skip() {
        written += site.write_posts(&plan.posts, pool)?;
    }
    if !plan.categories.is_skip() {
        written += site.write_categories()?;
    }
    if !plan.search.is_skip() {
        site.write_search()?;
        site.write_search_index()?;
        written += 2;
    }
    if !plan.archive.is_skip() {
        site.write_archive()?;
        written += 1;
    }
    if !plan.feeds.is_skip() {
        let feeds = site.has_site_url();
        written += gated(feeds && config.enable_rss, &output.join("rss.xml"), || site.write_rss())?;
        written += gated(feeds && config.enable_atom, &output.join("atom.xml"), || site.write_atom())?;
    }
    if !plan.sitemap.is_skip() {
        let enabled = site.has_site_url() && config.enable_sitemap;
        let has_about = layout.about.is_file();
        written += gated(enabled, &output.join("sitemap.xml"), || {
            site.write_sitemap(index_pages, has_about)
        })?;
    }
    if !plan.not_found.is_skip() {
        written += gated(config.enable_404, &output.join("404.html"), || site.write_not_found())?;
    }
    if !plan.about.is_skip() {
        let about = pipeline::parse_about_page(&layout.about, *converter, config.toc_depth()?)?;
        if site.write_about(about.as_ref())? {
            written += 1;
        }
    }
    Ok(written)
}

/// Run `write` when enabled; otherwise remove a leftover file from an
/// earlier build. Returns the number of files written.
fn gated(
    enabled: bool,
    path: &Path,
    write: impl FnOnce() -> Result<(), RenderError>,
) -> Result<usize, BuildError> {
    if enabled {
        write()?;
        return Ok(1);
    }
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed disabled artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(BuildError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    Ok(0)
}

/// Remove the output directory before a full rebuild.
///
/// Refuses the project root itself, anything outside it, and any directory
/// that contains one of the source directories.
fn clean_output_dir(layout: &Layout) -> Result<bool, BuildError> {
    if !layout.output.exists() {
        return Ok(false);
    }
    let canonical = |p: &Path| p.canonicalize().map_err(io_error(p));
    let output = canonical(&layout.output)?;
    let root = canonical(&layout.root)?;
    let holds_sources = [&layout.posts, &layout.templates, &layout.static_dir, &layout.config_dir]
        .into_iter()
        .filter_map(|dir| dir.canonicalize().ok())
        .any(|dir| dir.starts_with(&output));
    if output == root || !output.starts_with(&root) || holds_sources {
        return Err(BuildError::UnsafeClean(layout.output.clone()));
    }
    fs::remove_dir_all(&output).map_err(io_error(&output))?;
    info!(output = %layout.output.display(), "cleaned output directory");
    Ok(true)
}

// ============================================================================
// Check
// ============================================================================

/// What a build would do, computed without writing anything.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub published: usize,
    pub drafts: usize,
    pub changes: ChangeSet,
    pub decision: BuildDecision,
    /// `(source, slug)` for every post, in source order.
    pub slugs: Vec<(String, String)>,
}

/// Parse every post and classify changes against the lock file.
pub fn check_site(opts: &BuildOptions) -> Result<CheckReport, BuildError> {
    let prepared = prepare(opts)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_workers(&prepared.config))
        .build()?;
    let docs = pipeline::parse_all(
        &prepared.sources,
        &CmarkConverter,
        prepared.config.toc_depth()?,
        &pool,
    )?;
    let drafts = docs.iter().filter(|d| d.is_draft()).count();
    let slugs = resolve_slugs(&docs, prepared.prior.as_ref())
        .iter()
        .map(|(source, slug)| (source.to_string(), slug.to_string()))
        .collect();
    Ok(CheckReport {
        published: docs.len() - drafts,
        drafts,
        changes: prepared.changes,
        decision: prepared.decision,
        slugs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::tests::RecordingConverter;
    use crate::plan::Action;
    use crate::test_helpers::*;

    fn built(outcome: BuildOutcome) -> BuildReport {
        match outcome {
            BuildOutcome::Built(report) => report,
            BuildOutcome::Skipped => panic!("expected a build, got a skip"),
        }
    }

    // =========================================================================
    // First build and no-op
    // =========================================================================

    #[test]
    fn first_build_writes_everything() {
        let project = TestProject::new();
        project.post("hello", &[("date", "2026-01-10"), ("categories", "Rust, Notes")], "Hello body");

        let report = built(build_site(&project.options(at(2026, 2, 1))).unwrap());
        assert!(report.full_rebuild);
        assert_eq!(report.published, 1);
        assert_eq!(report.plan.posts, Action::Full);

        for rel in [
            "index.html",
            "posts/hello.html",
            "categories/rust.html",
            "categories/notes.html",
            "archive.html",
            "search.html",
            "search-index.json",
            "404.html",
            ".nojekyll",
            "css/site.css",
        ] {
            assert!(project.output_path(rel).exists(), "missing {rel}");
        }
        assert!(!project.output_path("rss.xml").exists());
        assert!(project.root().join("build.lock.json").exists());
    }

    #[test]
    fn second_build_is_skipped() {
        let project = TestProject::new();
        project.post("hello", &[("date", "2026-01-10")], "Hello body");
        let opts = project.options(at(2026, 2, 1));

        built(build_site(&opts).unwrap());
        assert!(matches!(build_site(&opts).unwrap(), BuildOutcome::Skipped));
    }

    #[test]
    fn no_incremental_always_builds() {
        let project = TestProject::new();
        project.post("hello", &[("date", "2026-01-10")], "Hello body");
        let mut opts = project.options(at(2026, 2, 1));
        opts.incremental = Some(false);

        built(build_site(&opts).unwrap());
        assert!(built(build_site(&opts).unwrap()).full_rebuild);
    }

    #[test]
    fn missing_output_forces_full_rebuild() {
        let project = TestProject::new();
        project.post("hello", &[("date", "2026-01-10")], "Hello body");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());

        fs::remove_dir_all(project.output_path("")).unwrap();
        let report = built(build_site(&opts).unwrap());
        assert!(report.full_rebuild);
        assert!(project.output_path("posts/hello.html").exists());
    }

    // =========================================================================
    // Selective rebuilds
    // =========================================================================

    #[test]
    fn body_edit_renders_only_that_post() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A body");
        project.post("b", &[("date", "2026-01-11")], "B body");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());

        project.post("a", &[("date", "2026-01-10")], "A body, edited");
        let report = built(build_site(&opts).unwrap());
        assert!(!report.full_rebuild);
        assert_eq!(report.modified, 1);
        assert_eq!(report.plan.posts, Action::Selective(["a".to_string()].into_iter().collect()));
        assert!(project.read_output("posts/a.html").contains("A body, edited"));
    }

    #[test]
    fn new_category_renders_all_posts() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10"), ("category", "One")], "A");
        project.post("b", &[("date", "2026-01-11"), ("category", "One")], "B");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());

        project.post("a", &[("date", "2026-01-10"), ("category", "Two")], "A");
        let report = built(build_site(&opts).unwrap());
        assert_eq!(report.plan.posts, Action::Full);
        assert!(project.read_output("posts/b.html").contains("categories/two.html"));
    }

    #[test]
    fn static_only_change_skips_parsing() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());

        project.write("static/css/site.css", "body { color: red }");
        let converter = RecordingConverter::default();
        let report = built(build_site_with(&opts, &converter).unwrap());
        assert_eq!(converter.call_count(), 0);
        assert_eq!(report.parsed, 0);
        assert!(report.plan.posts.is_skip());
        assert!(report.plan.index.is_skip());
        assert_eq!(project.read_output("css/site.css"), "body { color: red }");

        // Records carried forward: the next build is a no-op again.
        assert!(matches!(build_site(&opts).unwrap(), BuildOutcome::Skipped));
    }

    #[test]
    fn drafts_are_not_converted() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "published body");
        project.post("wip", &[("date", "2026-01-11"), ("draft", "true")], "secret body");

        let converter = RecordingConverter::default();
        let report = built(build_site_with(&project.options(at(2026, 2, 1)), &converter).unwrap());
        assert_eq!(converter.call_count(), 1);
        assert_eq!(report.drafts, 1);
        assert!(!project.output_path("posts/wip.html").exists());
        assert!(!project.read_output("index.html").contains("wip"));
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    #[test]
    fn draft_transition_removes_page() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());
        assert!(project.output_path("posts/a.html").exists());

        project.post("a", &[("date", "2026-01-10"), ("draft", "yes")], "A");
        let report = built(build_site(&opts).unwrap());
        assert_eq!(report.pages_removed, 1);
        assert!(!project.output_path("posts/a.html").exists());
    }

    #[test]
    fn explicit_slug_moves_page() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());

        project.post("a", &[("date", "2026-01-10"), ("slug", "Renamed Post")], "A");
        built(build_site(&opts).unwrap());
        assert!(project.output_path("posts/renamed-post.html").exists());
        assert!(!project.output_path("posts/a.html").exists());
    }

    // =========================================================================
    // About page and feeds
    // =========================================================================

    #[test]
    fn about_page_rebuilt_on_its_own_change() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        project.write("pages/about.md", "# About me\n\nFirst version");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());
        assert!(project.read_output("about.html").contains("First version"));

        project.write("pages/about.md", "# About me\n\nSecond version");
        let report = built(build_site(&opts).unwrap());
        assert!(!report.plan.about.is_skip());
        assert!(report.plan.index.is_skip());
        assert!(project.read_output("about.html").contains("Second version"));
    }

    #[test]
    fn feeds_follow_site_url() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        project.write("site.toml", "site_url = \"https://example.com/\"\n");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());
        assert!(project.read_output("rss.xml").contains("https://example.com/posts/a.html"));
        assert!(project.output_path("sitemap.xml").exists());

        project.write("site.toml", "site_url = \"\"\n");
        built(build_site(&opts).unwrap());
        assert!(!project.output_path("rss.xml").exists());
        assert!(!project.output_path("sitemap.xml").exists());
    }

    // =========================================================================
    // Errors and cleaning
    // =========================================================================

    #[test]
    fn missing_posts_directory_is_fatal() {
        let project = TestProject::new();
        fs::remove_dir_all(project.root().join("posts")).unwrap();
        let err = build_site(&project.options(at(2026, 2, 1))).unwrap_err();
        assert!(matches!(err, BuildError::MissingDirectory(_)));
        assert!(!project.output_path("").exists());
    }

    #[test]
    fn missing_base_template_is_fatal() {
        let project = TestProject::new();
        fs::remove_file(project.root().join("templates/base.html")).unwrap();
        let err = build_site(&project.options(at(2026, 2, 1))).unwrap_err();
        assert!(matches!(err, BuildError::MissingTemplate(_)));
    }

    #[test]
    fn parse_error_keeps_previous_lock() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());
        let lock_before = fs::read_to_string(project.root().join("build.lock.json")).unwrap();

        fs::write(project.root().join("posts/bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        let err = build_site(&opts).unwrap_err();
        assert!(matches!(err, BuildError::Parse(ParseError::Encoding { .. })));
        let lock_after = fs::read_to_string(project.root().join("build.lock.json")).unwrap();
        assert_eq!(lock_before, lock_after);
    }

    #[test]
    fn clean_removes_unknown_files() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let mut opts = project.options(at(2026, 2, 1));
        built(build_site(&opts).unwrap());
        project.write("dist/leftover.txt", "x");
        project.post("a", &[("date", "2026-01-10")], "A, edited");

        opts.clean = true;
        let report = built(build_site(&opts).unwrap());
        assert!(report.cleaned);
        assert!(!project.output_path("leftover.txt").exists());
        assert!(project.output_path("posts/a.html").exists());
    }

    #[test]
    fn clean_refuses_project_root() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        let mut opts = project.options(at(2026, 2, 1));
        opts.output = Some(PathBuf::from("."));
        opts.clean = true;

        let err = build_site(&opts).unwrap_err();
        assert!(matches!(err, BuildError::UnsafeClean(_)));
        assert!(project.root().join("posts/a.md").exists());
    }

    #[test]
    fn layout_paths_resolve_against_root_and_lock_against_config_dir() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        project.write("conf/site.toml", "site_name = \"Nested\"\n");
        let mut opts = project.options(at(2026, 2, 1));
        opts.config_path = project.root().join("conf/site.toml");

        built(build_site(&opts).unwrap());
        assert!(project.read_output("posts/a.html").contains("Nested"));
        assert!(project.root().join("conf/build.lock.json").exists());
        assert!(!project.root().join("build.lock.json").exists());
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_reports_without_writing() {
        let project = TestProject::new();
        project.post("a", &[("date", "2026-01-10")], "A");
        project.post("b", &[("date", "2026-01-11"), ("draft", "true")], "B");

        let report = check_site(&project.options(at(2026, 2, 1))).unwrap();
        assert_eq!(report.published, 1);
        assert_eq!(report.drafts, 1);
        assert!(report.decision.full_rebuild);
        assert_eq!(report.slugs[0], ("posts/a.md".to_string(), "a".to_string()));
        assert!(!project.output_path("").exists());
        assert!(!project.root().join("build.lock.json").exists());
    }
}
