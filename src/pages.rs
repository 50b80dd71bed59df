//! HTML and feed generation.
//!
//! Writes the artifacts the rebuild plan asks for. Every HTML page is the
//! user's `templates/base.html` with `{{key}}` placeholders filled in; the
//! page body and sidebar are built with [maud](https://maud.lambda.xyz/), so
//! anything taken from post metadata is escaped unless it is already HTML
//! (converted Markdown and the configured snippets).
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html               # Newest posts, page 1
//! ├── page-2.html              # Further index pages
//! ├── posts/<slug>.html        # One page per published post
//! ├── categories/<slug>.html   # One page per category
//! ├── archive.html             # By archive label and by month
//! ├── search.html              # Client-side search over search-index.json
//! ├── search-index.json
//! ├── rss.xml, atom.xml        # Only with site_url or custom_domain
//! ├── sitemap.xml              # Only with site_url or custom_domain
//! ├── 404.html
//! ├── about.html               # From pages/about.md
//! ├── CNAME, .nojekyll
//! └── …                        # Static assets, copied as-is
//! ```
//!
//! ## Template placeholders
//!
//! `title`, `root`, `site_name`, `site_description`, `year`, `extra_head`,
//! `analytics`, `content`, `sidebar`. `content` and `sidebar` are substituted
//! last so placeholder-like text inside a post is never expanded.

use crate::changes::StalenessPolicy;
use crate::config::{SiteConfig, Snippets};
use crate::content::slugify;
use crate::pipeline::AboutPage;
use crate::plan::Action;
use crate::types::Post;
use chrono::{Datelike, NaiveDateTime};
use maud::{Markup, PreEscaped, html};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Placeholders substituted after all others.
const LATE_KEYS: [&str; 2] = ["content", "sidebar"];

/// Fill `{{key}}` placeholders in `template`.
pub fn render_template(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in fields.iter().filter(|(k, _)| !LATE_KEYS.contains(k)) {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    for late in LATE_KEYS {
        if let Some((_, value)) = fields.iter().find(|(k, _)| *k == late) {
            out = out.replace(&format!("{{{{{late}}}}}"), value);
        }
    }
    out
}

/// Write `text` to `path`, creating parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<(), RenderError> {
    let result = match path.parent() {
        Some(dir) => fs::create_dir_all(dir).and_then(|_| fs::write(path, text)),
        None => fs::write(path, text),
    };
    result.map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy the contents of `static_dir` into `output_dir`.
///
/// Top-level directories are replaced wholesale so files deleted from a
/// static subdirectory disappear from the output too. Returns the number of
/// files copied.
pub fn copy_static(static_dir: &Path, output_dir: &Path) -> Result<usize, RenderError> {
    let wrap = |path: &Path| {
        let path = path.to_path_buf();
        move |source| RenderError::Write { path, source }
    };
    if !static_dir.is_dir() {
        return Ok(0);
    }
    fs::create_dir_all(output_dir).map_err(wrap(output_dir))?;
    let mut copied = 0;
    for entry in fs::read_dir(static_dir).map_err(wrap(static_dir))? {
        let entry = entry.map_err(wrap(static_dir))?;
        let src = entry.path();
        let dst = output_dir.join(entry.file_name());
        if src.is_dir() {
            if dst.exists() {
                fs::remove_dir_all(&dst).map_err(wrap(&dst))?;
            }
            copied += copy_dir_recursive(&src, &dst).map_err(wrap(&dst))?;
        } else {
            fs::copy(&src, &dst).map_err(wrap(&dst))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copied += copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// `CNAME` and `.nojekyll`, as configured. Returns the number of files written.
pub fn write_site_files(config: &SiteConfig, output_dir: &Path) -> Result<usize, RenderError> {
    let mut written = 0;
    let domain = config.custom_domain.trim();
    if !domain.is_empty() {
        write_text(&output_dir.join("CNAME"), &format!("{domain}\n"))?;
        written += 1;
    }
    if config.write_nojekyll {
        write_text(&output_dir.join(".nojekyll"), "")?;
        written += 1;
    }
    Ok(written)
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

fn post_url(root: &str, slug: &str) -> String {
    format!("{root}/posts/{slug}.html")
}

fn category_url(root: &str, name: &str) -> String {
    format!("{root}/categories/{}.html", slugify(name))
}

fn page_file(page: usize) -> String {
    if page == 1 {
        "index.html".to_string()
    } else {
        format!("page-{page}.html")
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn rfc822(value: NaiveDateTime) -> String {
    value.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn iso8601(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Site
// ============================================================================

/// Everything needed to render pages for one build.
pub struct Site<'a> {
    config: &'a SiteConfig,
    snippets: &'a Snippets,
    template: &'a str,
    output: &'a Path,
    now: NaiveDateTime,
    staleness: StalenessPolicy,
    site_url: String,
    /// Published posts, newest first.
    posts: &'a [Post],
    /// Category name → posts, one entry per category slug, ordered by
    /// lower-cased name.
    categories: Vec<(&'a str, Vec<&'a Post>)>,
    /// Archive label → posts.
    archives: BTreeMap<&'a str, Vec<&'a Post>>,
}

impl<'a> Site<'a> {
    /// `posts` must already be sorted newest first.
    pub fn new(
        config: &'a SiteConfig,
        snippets: &'a Snippets,
        template: &'a str,
        output: &'a Path,
        now: NaiveDateTime,
        posts: &'a [Post],
    ) -> Self {
        // Names that slugify alike share one page, titled by the first
        // spelling met in newest-first order.
        let mut by_slug: BTreeMap<String, (&str, Vec<&Post>)> = BTreeMap::new();
        let mut archives: BTreeMap<&str, Vec<&Post>> = BTreeMap::new();
        for post in posts {
            for category in &post.meta.categories {
                let (_, members) = by_slug
                    .entry(slugify(category))
                    .or_insert_with(|| (category.as_str(), Vec::new()));
                if !members.last().is_some_and(|last| std::ptr::eq(*last, post)) {
                    members.push(post);
                }
            }
            for label in &post.meta.archives {
                archives.entry(label.as_str()).or_default().push(post);
            }
        }
        let mut categories: Vec<(&str, Vec<&Post>)> = by_slug.into_values().collect();
        categories.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()).then(a.0.cmp(b.0)));

        Self {
            config,
            snippets,
            template,
            output,
            now,
            staleness: StalenessPolicy::from_days(config.stale_days),
            site_url: config.effective_site_url(),
            posts,
            categories,
            archives,
        }
    }

    fn page(&self, root: &str, title: &str, extra_head: &str, content: Markup, sidebar: Markup) -> String {
        render_template(
            self.template,
            &[
                ("title", &escape(title)),
                ("root", root),
                ("site_name", &escape(&self.config.site_name)),
                ("site_description", &escape(&self.config.site_description)),
                ("year", &self.now.year().to_string()),
                ("extra_head", extra_head),
                ("analytics", &self.snippets.analytics),
                ("content", &content.into_string()),
                ("sidebar", &sidebar.into_string()),
            ],
        )
    }

    // ------------------------------------------------------------------------
    // Shared fragments
    // ------------------------------------------------------------------------

    fn category_list(&self, root: &str) -> Markup {
        let mut by_count: Vec<&(&str, Vec<&Post>)> = self.categories.iter().collect();
        by_count.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        html! {
            ul.category-list {
                @if by_count.is_empty() {
                    li { "No categories yet." }
                }
                @for (name, posts) in by_count {
                    li {
                        a href=(category_url(root, name)) { (name) }
                        span.count { (posts.len()) }
                    }
                }
            }
        }
    }

    fn info_panels(&self) -> Markup {
        html! {
            div.panel {
                h3 { "About" }
                (PreEscaped(&self.snippets.about))
            }
            @if !self.snippets.widget.is_empty() {
                div.panel.panel-widget {
                    h3 { "Stats" }
                    (PreEscaped(&self.snippets.widget))
                }
            }
        }
    }

    fn sidebar(&self, root: &str, toc_html: &str) -> Markup {
        html! {
            (self.info_panels())
            @if toc_html.contains("<li") {
                div.panel {
                    h3 { "Contents" }
                    (PreEscaped(toc_html))
                }
            }
            div.panel {
                h3 { "Categories" }
                (self.category_list(root))
            }
        }
    }

    /// Other posts sharing an archive label with `post`. `None` when the post
    /// has no labels.
    fn archive_sidebar(&self, post: &Post) -> Option<Markup> {
        if post.meta.archives.is_empty() {
            return None;
        }
        let groups: Vec<(&str, Vec<&Post>)> = post
            .meta
            .archives
            .iter()
            .filter_map(|label| {
                let related: Vec<&Post> = self
                    .archives
                    .get(label.as_str())?
                    .iter()
                    .copied()
                    .filter(|other| other.slug != post.slug)
                    .collect();
                (!related.is_empty()).then_some((label.as_str(), related))
            })
            .collect();
        Some(html! {
            @if groups.is_empty() {
                p.sidebar-empty { "No other posts in this archive yet." }
            }
            @for (label, related) in &groups {
                div.sidebar-archive-group {
                    h4 { (label) }
                    ul.sidebar-archive-list {
                        @for item in related {
                            li {
                                a href=(post_url("..", &item.slug)) { (item.meta.title) }
                                span.archive-date { (item.meta.date.display()) }
                            }
                        }
                    }
                }
            }
        })
    }

    fn post_sidebar(&self, post: &Post) -> Markup {
        let mut sections: Vec<(&str, &str, Markup)> = Vec::new();
        if post.body.toc_html.contains("<li") {
            sections.push(("contents", "Contents", PreEscaped(post.body.toc_html.clone())));
        }
        if let Some(archive) = self.archive_sidebar(post) {
            sections.push(("archive", "Archive", archive));
        }
        sections.push(("categories", "Categories", self.category_list("..")));

        html! {
            (self.info_panels())
            @if let [(_, label, body)] = sections.as_slice() {
                div.panel {
                    h3 { (label) }
                    (body)
                }
            } @else {
                div.panel.sidebar-tabs data-tabs="true" {
                    div.sidebar-tablist {
                        @for (i, (id, label, _)) in sections.iter().enumerate() {
                            button.sidebar-tab.is-active[i == 0] type="button" data-tab=(id) { (label) }
                        }
                    }
                    div.sidebar-tabcontent {
                        @for (i, (id, _, body)) in sections.iter().enumerate() {
                            section.sidebar-tabpanel.is-active[i == 0] data-tab=(id) { (body) }
                        }
                    }
                }
            }
        }
    }

    fn post_cards(&self, posts: &[&Post], root: &str) -> Markup {
        html! {
            @for (idx, post) in posts.iter().enumerate() {
                @let url = post_url(root, &post.slug);
                article.post-card style=(format!("animation-delay: {:.2}s", (idx as f64 * 0.05).min(0.3))) {
                    div.post-meta {
                        div.post-meta-left {
                            span.post-date { (post.meta.date.display()) }
                            span.post-words { (post.body.words) " words" }
                        }
                        div.post-tags { (category_chips(&post.meta.categories, root)) }
                    }
                    h2.post-title { a href=(url) { (post.meta.title) } }
                    p.post-summary { (post.body.summary) }
                    a.post-more href=(url) { "Read more" }
                }
            }
        }
    }

    fn section_head(title: &str, blurb: &str) -> Markup {
        html! {
            div.section-head {
                h2 { (title) }
                p { (blurb) }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Artifacts
    // ------------------------------------------------------------------------

    /// Paginated index. Index pages beyond the new page count are removed.
    /// Returns the number of index pages.
    pub fn write_index(&self) -> Result<usize, RenderError> {
        let per_page = self.config.posts_per_page.max(1);
        let all: Vec<&Post> = self.posts.iter().collect();
        let pages: Vec<&[&Post]> = if all.is_empty() {
            vec![&all[..]]
        } else {
            all.chunks(per_page).collect()
        };
        let total = pages.len();

        for (i, chunk) in pages.iter().enumerate() {
            let page = i + 1;
            let content = html! {
                (Self::section_head("Latest posts", "Fresh notes generated from your Markdown folder."))
                div.post-grid { (self.post_cards(chunk, ".")) }
                (pagination(page, total))
            };
            let title = if page == 1 {
                format!("{} | Home", self.config.site_name)
            } else {
                format!("{} | Page {page}", self.config.site_name)
            };
            let doc = self.page(".", &title, "", content, self.sidebar(".", ""));
            write_text(&self.output.join(page_file(page)), &doc)?;
        }

        let mut extra = total + 1;
        loop {
            let path = self.output.join(page_file(extra));
            match fs::remove_file(&path) {
                Ok(()) => extra += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(source) => return Err(RenderError::Write { path, source }),
            }
        }
        Ok(total)
    }

    fn render_post(&self, post: &Post) -> String {
        let root = "..";
        let show_updated = self.config.show_updated && post.meta.updated != post.meta.date;
        let notice = self.config.stale_notice.trim();
        let stale = !notice.is_empty() && self.staleness.is_stale(post.meta.updated.value, self.now);
        let content = html! {
            article.post {
                div.post-meta {
                    div.post-meta-left {
                        span.post-date { (post.meta.date.display()) }
                        @if show_updated {
                            span.post-updated { "Updated " (post.meta.updated.display()) }
                        }
                        span.post-words { (post.body.words) " words" }
                    }
                    div.post-tags { (category_chips(&post.meta.categories, root)) }
                }
                h1.post-title { (post.meta.title) }
                @if stale {
                    div.stale-warning { (notice) }
                }
                div.post-body { (PreEscaped(&post.body.html)) }
                div.post-footer { a href={ (root) "/index.html" } { "Back to home" } }
            }
        };
        let title = format!("{} | {}", post.meta.title, self.config.site_name);
        let extra_head = format!(r#"<script src="{root}/js/sidebar-tabs.js" defer></script>"#);
        self.page(root, &title, &extra_head, content, self.post_sidebar(post))
    }

    /// Post pages selected by `action`, rendered on `pool`. Returns the
    /// number of pages written.
    pub fn write_posts(&self, action: &Action, pool: &ThreadPool) -> Result<usize, RenderError> {
        let selected: Vec<&Post> = self
            .posts
            .iter()
            .filter(|post| action.includes(&post.slug))
            .collect();
        let dir = self.output.join("posts");
        pool.install(|| {
            selected
                .par_iter()
                .map(|post| {
                    write_text(&dir.join(format!("{}.html", post.slug)), &self.render_post(post))
                })
                .collect::<Result<Vec<()>, RenderError>>()
        })?;
        Ok(selected.len())
    }

    /// One page per category. Pages of categories that no longer exist are
    /// removed. Returns the number of pages written.
    pub fn write_categories(&self) -> Result<usize, RenderError> {
        let dir = self.output.join("categories");
        let mut live = BTreeSet::new();
        for (name, posts) in &self.categories {
            let content = html! {
                (Self::section_head(name, "Posts grouped in this category."))
                div.post-grid { (self.post_cards(posts, "..")) }
            };
            let title = format!("{name} | {}", self.config.site_name);
            let doc = self.page("..", &title, "", content, self.sidebar("..", ""));
            let file = format!("{}.html", slugify(name));
            write_text(&dir.join(&file), &doc)?;
            live.insert(file);
        }
        remove_unlisted_pages(&dir, &live)?;
        Ok(self.categories.len())
    }

    pub fn write_search(&self) -> Result<(), RenderError> {
        let content = html! {
            (Self::section_head("Search", "Filter posts by title, summary, date, or category."))
            div.search-bar {
                input id="search-input" class="search-input" type="search" placeholder="Type to search...";
                div id="search-status" class="search-status" { "Type to filter posts." }
            }
            div id="search-results" class="post-grid" {}
        };
        let title = format!("{} | Search", self.config.site_name);
        let extra_head = r#"<script src="./js/search.js" defer></script>"#;
        let doc = self.page(".", &title, extra_head, content, self.sidebar(".", ""));
        write_text(&self.output.join("search.html"), &doc)
    }

    pub fn write_search_index(&self) -> Result<(), RenderError> {
        #[derive(Serialize)]
        struct Category<'c> {
            name: &'c str,
            slug: String,
        }
        #[derive(Serialize)]
        struct Entry<'e> {
            title: &'e str,
            url: String,
            summary: &'e str,
            date: String,
            categories: Vec<Category<'e>>,
        }

        let entries: Vec<Entry> = self
            .posts
            .iter()
            .map(|post| Entry {
                title: &post.meta.title,
                url: format!("posts/{}.html", post.slug),
                summary: &post.body.summary,
                date: post.meta.date.display(),
                categories: post
                    .meta
                    .categories
                    .iter()
                    .map(|name| Category {
                        name,
                        slug: slugify(name),
                    })
                    .collect(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)?;
        write_text(&self.output.join("search-index.json"), &json)
    }

    pub fn write_archive(&self) -> Result<(), RenderError> {
        let root = ".";

        // Labels with the most recent post first. Posts are already newest first.
        let mut labelled: Vec<(&&str, &Vec<&Post>)> = self.archives.iter().collect();
        labelled.sort_by(|a, b| {
            let newest = |items: &Vec<&Post>| items.first().map(|p| p.meta.date.value);
            newest(b.1).cmp(&newest(a.1)).then(a.0.cmp(b.0))
        });

        let mut months: BTreeMap<String, Vec<&Post>> = BTreeMap::new();
        let mut years: BTreeMap<i32, usize> = BTreeMap::new();
        for post in self.posts {
            months
                .entry(post.meta.date.value.format("%Y-%m").to_string())
                .or_default()
                .push(post);
            *years.entry(post.meta.date.value.year()).or_default() += 1;
        }
        let total_words: usize = self.posts.iter().map(|p| p.body.words).sum();

        let content = html! {
            (Self::section_head("Archive", "All posts by date."))
            @if !self.posts.is_empty() {
                div.archive-stats {
                    div.archive-total { "Total " (self.posts.len()) " posts" }
                    div.archive-total { "Total " (total_words) " words" }
                    ul.archive-year-list {
                        @for (year, count) in years.iter().rev() {
                            li {
                                span.archive-year { (year) }
                                span.archive-count { (count) }
                            }
                        }
                    }
                }
            }
            div.archive-controls {
                button.archive-toggle.is-active type="button" data-view="archive" { "By archive" }
                button.archive-toggle type="button" data-view="time" { "By date" }
            }
            div.archive-views {
                section.archive-view.is-active data-view="archive" {
                    @if labelled.is_empty() {
                        p.archive-empty { "No archive groups yet." }
                    }
                    @for (label, items) in &labelled {
                        (archive_group(label, items))
                    }
                }
                section.archive-view data-view="time" {
                    @for (month, items) in months.iter().rev() {
                        (archive_group(month, items))
                    }
                }
            }
        };
        let title = format!("Archive | {}", self.config.site_name);
        let extra_head = format!(r#"<script src="{root}/js/archive.js" defer></script>"#);
        let doc = self.page(root, &title, &extra_head, content, self.sidebar(root, ""));
        write_text(&self.output.join("archive.html"), &doc)
    }

    /// Whether feeds and the sitemap can be generated at all.
    pub fn has_site_url(&self) -> bool {
        !self.site_url.is_empty()
    }

    fn feed_posts(&self) -> &[Post] {
        &self.posts[..self.posts.len().min(self.config.feed_limit)]
    }

    fn last_updated(&self) -> NaiveDateTime {
        self.posts.first().map(|p| p.meta.date.value).unwrap_or(self.now)
    }

    pub fn write_rss(&self) -> Result<(), RenderError> {
        let mut lines = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<rss version="2.0">"#.to_string(),
            "<channel>".to_string(),
            format!("<title>{}</title>", escape(&self.config.site_name)),
            format!("<link>{}/</link>", self.site_url),
            format!("<description>{}</description>", escape(&self.config.site_description)),
            format!("<lastBuildDate>{}</lastBuildDate>", rfc822(self.last_updated())),
        ];
        for post in self.feed_posts() {
            let link = join_url(&self.site_url, &format!("posts/{}.html", post.slug));
            lines.extend([
                "<item>".to_string(),
                format!("<title>{}</title>", escape(&post.meta.title)),
                format!("<link>{link}</link>"),
                format!("<guid>{link}</guid>"),
                format!("<pubDate>{}</pubDate>", rfc822(post.meta.date.value)),
                format!("<description>{}</description>", escape(&post.body.summary)),
                "</item>".to_string(),
            ]);
        }
        lines.extend(["</channel>".to_string(), "</rss>".to_string()]);
        write_text(&self.output.join("rss.xml"), &lines.join("\n"))
    }

    pub fn write_atom(&self) -> Result<(), RenderError> {
        let mut lines = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<feed xmlns="http://www.w3.org/2005/Atom">"#.to_string(),
            format!("<title>{}</title>", escape(&self.config.site_name)),
            format!("<id>{}/</id>", self.site_url),
            format!("<updated>{}</updated>", iso8601(self.last_updated())),
            format!(r#"<link href="{}/atom.xml" rel="self" />"#, self.site_url),
            format!(r#"<link href="{}/" />"#, self.site_url),
        ];
        for post in self.feed_posts() {
            let link = join_url(&self.site_url, &format!("posts/{}.html", post.slug));
            lines.extend([
                "<entry>".to_string(),
                format!("<title>{}</title>", escape(&post.meta.title)),
                format!(r#"<link href="{link}" />"#),
                format!("<id>{link}</id>"),
                format!("<updated>{}</updated>", iso8601(post.meta.updated.value)),
                format!("<summary>{}</summary>", escape(&post.body.summary)),
                "</entry>".to_string(),
            ]);
        }
        lines.push("</feed>".to_string());
        write_text(&self.output.join("atom.xml"), &lines.join("\n"))
    }

    pub fn write_sitemap(&self, index_pages: usize, has_about: bool) -> Result<(), RenderError> {
        let mut urls: Vec<(String, Option<String>)> = vec![(format!("{}/", self.site_url), None)];
        let mut fixed = vec!["archive.html", "search.html"];
        if has_about {
            fixed.push("about.html");
        }
        if self.config.enable_rss {
            fixed.push("rss.xml");
        }
        if self.config.enable_atom {
            fixed.push("atom.xml");
        }
        if self.config.enable_404 {
            fixed.push("404.html");
        }
        urls.extend(fixed.into_iter().map(|f| (join_url(&self.site_url, f), None)));
        urls.extend((2..=index_pages).map(|n| (join_url(&self.site_url, &page_file(n)), None)));
        for post in self.posts {
            urls.push((
                join_url(&self.site_url, &format!("posts/{}.html", post.slug)),
                Some(post.meta.updated.value.format("%Y-%m-%d").to_string()),
            ));
        }
        for (name, _) in &self.categories {
            urls.push((join_url(&self.site_url, &category_url("", name)), None));
        }

        let mut lines = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string(),
        ];
        for (loc, lastmod) in urls {
            lines.push("<url>".to_string());
            lines.push(format!("<loc>{}</loc>", escape(&loc)));
            if let Some(lastmod) = lastmod {
                lines.push(format!("<lastmod>{lastmod}</lastmod>"));
            }
            lines.push("</url>".to_string());
        }
        lines.push("</urlset>".to_string());
        write_text(&self.output.join("sitemap.xml"), &lines.join("\n"))
    }

    pub fn write_not_found(&self) -> Result<(), RenderError> {
        let root = ".";
        let content = html! {
            (Self::section_head("404", "Page not found. Try heading back to the homepage."))
            div.post-card {
                p.post-summary { "The page you requested does not exist." }
                a.post-more href={ (root) "/index.html" } { "Back to home" }
            }
        };
        let title = format!("404 | {}", self.config.site_name);
        let doc = self.page(root, &title, "", content, self.sidebar(root, ""));
        write_text(&self.output.join("404.html"), &doc)
    }

    /// `about.html` from the standalone about page, or remove a stale one
    /// when the source is gone. Returns whether a page was written.
    pub fn write_about(&self, about: Option<&AboutPage>) -> Result<bool, RenderError> {
        let path = self.output.join("about.html");
        let Some(about) = about else {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(false),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(source) => Err(RenderError::Write { path, source }),
            };
        };
        let content = html! {
            article.post {
                h1.post-title { (about.title) }
                div.post-body { (PreEscaped(&about.html)) }
            }
        };
        let title = format!("{} | {}", about.title, self.config.site_name);
        let doc = self.page(".", &title, "", content, self.sidebar(".", &about.toc_html));
        write_text(&path, &doc)?;
        Ok(true)
    }
}

fn archive_group(title: &str, items: &[&Post]) -> Markup {
    html! {
        section.archive-group {
            h3 { (title) }
            ul.archive-list {
                @for item in items {
                    li {
                        span.archive-date { (item.meta.date.display()) }
                        a href=(post_url(".", &item.slug)) { (item.meta.title) }
                    }
                }
            }
        }
    }
}

fn category_chips(categories: &[String], root: &str) -> Markup {
    html! {
        @for (i, name) in categories.iter().enumerate() {
            @if i > 0 { " " }
            a.chip href=(category_url(root, name)) { (name) }
        }
    }
}

fn pagination(page: usize, total: usize) -> Markup {
    html! {
        @if total > 1 {
            nav.pagination {
                @if page > 1 {
                    a.page-link href={ "./" (page_file(page - 1)) } { "Previous" }
                } @else {
                    span.page-link.is-disabled { "Previous" }
                }
                div.page-numbers {
                    @for n in 1..=total {
                        @if n == page {
                            span.page-number.is-active { (n) }
                        } @else {
                            a.page-number href={ "./" (page_file(n)) } { (n) }
                        }
                    }
                }
                @if page < total {
                    a.page-link href={ "./" (page_file(page + 1)) } { "Next" }
                } @else {
                    span.page-link.is-disabled { "Next" }
                }
            }
        }
    }
}

/// Remove `*.html` files in `dir` whose names are not in `keep`.
fn remove_unlisted_pages(dir: &Path, keep: &BTreeSet<String>) -> Result<(), RenderError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(RenderError::Write {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".html") && !keep.contains(&name) {
            let path = entry.path();
            fs::remove_file(&path).map_err(|source| RenderError::Write { path, source })?;
        }
    }
    Ok(())
}
