//! Site configuration module.
//!
//! Handles loading and validating `site.toml`, and resolving the injected
//! HTML snippets (analytics, sidebar widget, sidebar about panel) that the
//! config points at.
//!
//! ## Config File Location
//!
//! `site.toml` lives in the project root (override with `--config`).
//! Directory settings (`posts`, `static_dir`, `output`, `templates`,
//! `pages`) resolve against the project root. The lock file and snippet
//! files resolve against the directory containing the config file.
//!
//! ```text
//! project/
//! ├── site.toml             # This file (optional)
//! ├── build.lock.json       # Written by the build
//! ├── posts/                # Markdown posts (required)
//! ├── pages/about.md        # Standalone about page (optional)
//! ├── templates/base.html   # Page layout (required)
//! ├── static/               # Copied into the output root
//! └── dist/                 # Generated site
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! site_name = "Field Notes"
//! stale_days = 180
//! ```
//!
//! Unknown keys are rejected to catch typos early. Run
//! `simple-blog gen-config` for a fully commented file with every default.

use crate::markdown::{CmarkConverter, MarkdownConverter, TocDepth};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Default config file name, relative to the project root.
pub const CONFIG_FILENAME: &str = "site.toml";

/// Hard ceiling on worker threads regardless of configuration.
pub const MAX_WORKERS: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory containing Markdown posts.
    pub posts: PathBuf,
    /// Directory of static assets copied into the output root.
    pub static_dir: PathBuf,
    /// Output directory for the generated site.
    pub output: PathBuf,
    /// Directory holding `base.html`.
    pub templates: PathBuf,
    /// Directory holding standalone pages (`about.md`).
    pub pages: PathBuf,
    pub site_name: String,
    pub site_description: String,
    /// Written to `CNAME`; also implies `site_url` when that is empty.
    pub custom_domain: String,
    /// Public URL used for feeds and the sitemap.
    pub site_url: String,
    /// Wipe the output directory before a full rebuild.
    pub clean: bool,
    pub feed_limit: usize,
    pub posts_per_page: usize,
    /// Worker threads for parsing and rendering; 0 = one per core.
    pub build_workers: usize,
    /// Heading depth range for the table of contents, e.g. `"2-4"`.
    pub toc_depth: String,
    pub show_updated: bool,
    /// Days after the last update before a post shows the stale notice.
    /// 0 disables the notice.
    pub stale_days: u32,
    pub stale_notice: String,
    pub enable_rss: bool,
    pub enable_atom: bool,
    pub enable_sitemap: bool,
    pub enable_404: bool,
    pub write_nojekyll: bool,
    /// Use the lock file to skip unchanged work.
    pub incremental: bool,
    /// Lock file path, relative to the config file's directory.
    pub lock_file: PathBuf,
    pub analytics_file: String,
    pub analytics_html: String,
    pub widget_file: String,
    pub widget_html: String,
    pub about_text: String,
    pub about_html: String,
    pub about_file: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts: PathBuf::from("posts"),
            static_dir: PathBuf::from("static"),
            output: PathBuf::from("dist"),
            templates: PathBuf::from("templates"),
            pages: PathBuf::from("pages"),
            site_name: "Simple MD Blog".to_string(),
            site_description: "A tiny, fast Markdown blog.".to_string(),
            custom_domain: String::new(),
            site_url: String::new(),
            clean: false,
            feed_limit: 20,
            posts_per_page: 8,
            build_workers: 0,
            toc_depth: "2-4".to_string(),
            show_updated: true,
            stale_days: 365,
            stale_notice: "This post may be outdated.".to_string(),
            enable_rss: true,
            enable_atom: true,
            enable_sitemap: true,
            enable_404: true,
            write_nojekyll: true,
            incremental: true,
            lock_file: PathBuf::from("build.lock.json"),
            analytics_file: String::new(),
            analytics_html: String::new(),
            widget_file: String::new(),
            widget_html: String::new(),
            about_text: String::new(),
            about_html: String::new(),
            about_file: String::new(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.posts_per_page == 0 {
            return Err(ConfigError::Validation(
                "posts_per_page must be at least 1".into(),
            ));
        }
        self.toc_depth()?;
        Ok(())
    }

    /// Parsed `toc_depth`.
    pub fn toc_depth(&self) -> Result<TocDepth, ConfigError> {
        self.toc_depth
            .parse()
            .map_err(|e| ConfigError::Validation(format!("toc_depth: {e}")))
    }

    /// Public base URL: `site_url`, else `https://<custom_domain>`, else empty.
    pub fn effective_site_url(&self) -> String {
        let url = self.site_url.trim();
        if !url.is_empty() {
            return url.trim_end_matches('/').to_string();
        }
        let domain = self.custom_domain.trim();
        if domain.is_empty() {
            String::new()
        } else {
            format!("https://{domain}")
        }
    }
}

/// Resolve the effective worker count from config.
///
/// - `0` → all available cores
/// - `n` → `n`
///
/// Clamped to `1..=MAX_WORKERS` either way.
pub fn effective_workers(config: &SiteConfig) -> usize {
    let requested = if config.build_workers == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        config.build_workers
    };
    requested.clamp(1, MAX_WORKERS)
}

/// Load config from a `site.toml` path.
///
/// A missing file yields the defaults. An unreadable or invalid file is an
/// error: building with half-applied settings would be worse than stopping.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Injected snippets
// =============================================================================

/// The HTML fragments injected into every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippets {
    pub analytics: String,
    pub widget: String,
    pub about: String,
}

impl Snippets {
    /// Resolve all snippets. `base` is the config file's directory.
    pub fn resolve(config: &SiteConfig, base: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            analytics: resolve_snippet(&config.analytics_html, &config.analytics_file, base)?,
            widget: resolve_snippet(&config.widget_html, &config.widget_file, base)?,
            about: resolve_about_html(config, base)?,
        })
    }
}

fn resolve_path(value: &str, base: &Path) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Inline HTML wins over a file. A missing file is warned about and ignored.
fn resolve_snippet(inline: &str, file: &str, base: &Path) -> Result<String, ConfigError> {
    if !inline.trim().is_empty() {
        return Ok(inline.trim().to_string());
    }
    if file.trim().is_empty() {
        return Ok(String::new());
    }
    let path = resolve_path(file.trim(), base);
    if !path.exists() {
        warn!(path = %path.display(), "snippet file not found");
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

fn paragraph(text: &str) -> String {
    let escaped = maud::html! { (text) }.into_string();
    format!("<p>{}</p>", escaped.replace('\n', "<br>"))
}

/// The sidebar about panel.
///
/// Priority: `about_html`, then `about_file` (`.html`/`.htm` as-is, `.md`
/// converted, anything else as escaped text), then `about_text`, then the
/// site description.
fn resolve_about_html(config: &SiteConfig, base: &Path) -> Result<String, ConfigError> {
    if !config.about_html.trim().is_empty() {
        return Ok(config.about_html.trim().to_string());
    }
    let file = config.about_file.trim();
    if !file.is_empty() {
        let path = resolve_path(file, base);
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            return Ok(match ext.as_str() {
                "html" | "htm" => text,
                "md" => CmarkConverter.convert(&text, config.toc_depth()?).html,
                _ => paragraph(&text),
            });
        }
        warn!(path = %path.display(), "about file not found");
    }
    if !config.about_text.trim().is_empty() {
        return Ok(paragraph(config.about_text.trim()));
    }
    Ok(paragraph(&config.site_description))
}

/// Returns a fully-commented stock `site.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Blog Configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Layout paths are relative to the project root (--root). lock_file and
# snippet files are relative to the directory containing this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
posts = "posts"            # Markdown posts (required to exist)
static_dir = "static"      # Copied into the output root
output = "dist"            # Generated site
templates = "templates"    # Must contain base.html
pages = "pages"            # pages/about.md becomes about.html

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
site_name = "Simple MD Blog"
site_description = "A tiny, fast Markdown blog."
custom_domain = ""         # Written to CNAME
site_url = ""              # Needed for RSS, Atom and sitemap

# ---------------------------------------------------------------------------
# Build behaviour
# ---------------------------------------------------------------------------
incremental = true         # Reuse build.lock.json to skip unchanged work
lock_file = "build.lock.json"
clean = false              # Wipe the output directory on full rebuilds
build_workers = 0          # Parse/render threads (0 = one per core, max 32)

# ---------------------------------------------------------------------------
# Content
# ---------------------------------------------------------------------------
posts_per_page = 8
feed_limit = 20
toc_depth = "2-4"          # Heading levels in the table of contents
show_updated = true
stale_days = 365           # 0 disables the stale notice
stale_notice = "This post may be outdated."

# ---------------------------------------------------------------------------
# Generated files
# ---------------------------------------------------------------------------
enable_rss = true
enable_atom = true
enable_sitemap = true
enable_404 = true
write_nojekyll = true

# ---------------------------------------------------------------------------
# Injected snippets (inline HTML wins over files)
# ---------------------------------------------------------------------------
analytics_html = ""
analytics_file = ""
widget_html = ""
widget_file = ""
about_html = ""
about_file = ""            # .html, .md or plain text
about_text = ""
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.posts, PathBuf::from("posts"));
        assert_eq!(config.stale_days, 365);
        assert!(config.incremental);
        assert!(!config.clean);
        assert_eq!(config.toc_depth().unwrap(), TocDepth { min: 2, max: 4 });
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let parsed: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, SiteConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str("site_name = \"Notes\"\nstale_days = 0").unwrap();
        assert_eq!(config.site_name, "Notes");
        assert_eq!(config.stale_days, 0);
        assert_eq!(config.feed_limit, 20);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("site_nmae = \"typo\"");
        assert!(result.is_err());
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "site_name = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "toc_depth = \"5-2\"").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));

        fs::write(&path, "posts_per_page = 0").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn effective_workers_clamped() {
        let mut config = SiteConfig::default();
        assert!(effective_workers(&config) >= 1);
        config.build_workers = 1000;
        assert_eq!(effective_workers(&config), MAX_WORKERS);
        config.build_workers = 3;
        assert_eq!(effective_workers(&config), 3);
    }

    #[test]
    fn effective_site_url_prefers_site_url() {
        let mut config = SiteConfig::default();
        assert_eq!(config.effective_site_url(), "");
        config.custom_domain = "blog.example.com".into();
        assert_eq!(config.effective_site_url(), "https://blog.example.com");
        config.site_url = "https://example.org/blog/".into();
        assert_eq!(config.effective_site_url(), "https://example.org/blog");
    }

    // =========================================================================
    // Snippets
    // =========================================================================

    #[test]
    fn inline_snippet_wins_over_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.html"), "<script>file</script>").unwrap();
        let config = SiteConfig {
            analytics_html: "<script>inline</script>".into(),
            analytics_file: "a.html".into(),
            ..Default::default()
        };
        let snippets = Snippets::resolve(&config, tmp.path()).unwrap();
        assert_eq!(snippets.analytics, "<script>inline</script>");
    }

    #[test]
    fn snippet_file_relative_to_base() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("w.html"), "<b>widget</b>").unwrap();
        let config = SiteConfig {
            widget_file: "w.html".into(),
            ..Default::default()
        };
        let snippets = Snippets::resolve(&config, tmp.path()).unwrap();
        assert_eq!(snippets.widget, "<b>widget</b>");
    }

    #[test]
    fn missing_snippet_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            analytics_file: "nope.html".into(),
            ..Default::default()
        };
        assert_eq!(Snippets::resolve(&config, tmp.path()).unwrap().analytics, "");
    }

    #[test]
    fn about_falls_back_to_escaped_description() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            site_description: "Notes & <things>".into(),
            ..Default::default()
        };
        let snippets = Snippets::resolve(&config, tmp.path()).unwrap();
        assert_eq!(snippets.about, "<p>Notes &amp; &lt;things&gt;</p>");
    }

    #[test]
    fn about_markdown_file_is_converted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("about.md"), "Hi *there*").unwrap();
        let config = SiteConfig {
            about_file: "about.md".into(),
            ..Default::default()
        };
        let snippets = Snippets::resolve(&config, tmp.path()).unwrap();
        assert!(snippets.about.contains("<em>there</em>"));
    }

    #[test]
    fn about_text_keeps_line_breaks() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            about_text: "line one\nline two".into(),
            ..Default::default()
        };
        let snippets = Snippets::resolve(&config, tmp.path()).unwrap();
        assert_eq!(snippets.about, "<p>line one<br>line two</p>");
    }
}
