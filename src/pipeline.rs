//! Parallel content pipeline.
//!
//! Discovers post sources, then parses every one of them into a
//! [`ContentDocument`] on the build's worker pool. Each unit of work reads
//! one file and produces one value, so the phase needs no locking: rayon's
//! indexed `collect` keeps the results in source order and stops at the
//! first error.
//!
//! Drafts are parsed for metadata only. Their bodies never reach the
//! Markdown converter.

use crate::content::{
    categories, count_words, extract_title, fix_relative_img_src, normalize_list_spacing,
    parse_front_matter, post_date, slugify, strip_tags, summarize, updated_date,
};
use crate::fingerprint::{self, FingerprintError};
use crate::markdown::{MarkdownConverter, TocDepth};
use crate::types::{ContentDocument, PostMeta, RenderedBody};
use chrono::{DateTime, Local, NaiveDateTime};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Characters kept in an auto-generated summary.
const SUMMARY_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },
}

/// A post source found on disk, with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub rel: String,
    pub hash: String,
}

/// All `*.md` files under `posts_dir`, sorted by relative path.
pub fn discover_posts(
    posts_dir: &Path,
    project_root: &Path,
) -> Result<Vec<SourceFile>, FingerprintError> {
    let mut sources = fingerprint::list_files(posts_dir)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "md"))
        .map(|path| {
            let hash = fingerprint::hash_file(&path)?;
            Ok(SourceFile {
                rel: fingerprint::normalized_relative(&path, project_root),
                path,
                hash,
            })
        })
        .collect::<Result<Vec<_>, FingerprintError>>()?;
    sources.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(sources)
}

fn read_source(path: &Path) -> Result<String, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| ParseError::Encoding {
        path: path.to_path_buf(),
    })
}

fn modified_time(path: &Path) -> Result<NaiveDateTime, ParseError> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Parse one source file.
pub fn parse_post(
    source: &SourceFile,
    converter: &impl MarkdownConverter,
    depth: TocDepth,
) -> Result<ContentDocument, ParseError> {
    let text = read_source(&source.path)?;
    let modified = modified_time(&source.path)?;
    let (front, body) = parse_front_matter(&text);
    let (title, body) = extract_title(&front, &body);
    let date = post_date(&front, modified);
    let stem = source
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let meta = PostMeta {
        source: source.rel.clone(),
        hash: source.hash.clone(),
        title,
        date,
        updated: updated_date(&front, date),
        categories: categories(&front),
        archives: front.list("archive").map(<[String]>::to_vec).unwrap_or_default(),
        explicit_slug: front.text("slug").map(slugify),
        stem_slug: slugify(&stem),
    };
    if front.flag("draft") {
        return Ok(ContentDocument::Draft { meta });
    }

    let converted = converter.convert(&normalize_list_spacing(&body), depth);
    let html = fix_relative_img_src(&converted.html, "..");
    let summary = front
        .text("summary")
        .or_else(|| front.text("description"))
        .map(str::to_string)
        .unwrap_or_else(|| summarize(&html, SUMMARY_CHARS));
    let words = count_words(&strip_tags(&html));

    Ok(ContentDocument::Published {
        meta,
        body: RenderedBody {
            html,
            toc_html: converted.toc_html,
            summary,
            words,
        },
    })
}

/// Parse every source on `pool`. Results keep the order of `sources`.
pub fn parse_all(
    sources: &[SourceFile],
    converter: &impl MarkdownConverter,
    depth: TocDepth,
    pool: &ThreadPool,
) -> Result<Vec<ContentDocument>, ParseError> {
    pool.install(|| {
        sources
            .par_iter()
            .map(|source| parse_post(source, converter, depth))
            .collect()
    })
}

/// The standalone about page (`pages/about.md`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AboutPage {
    pub title: String,
    pub html: String,
    pub toc_html: String,
}

/// Parse the about page if it exists. Images resolve from the output root.
pub fn parse_about_page(
    path: &Path,
    converter: &impl MarkdownConverter,
    depth: TocDepth,
) -> Result<Option<AboutPage>, ParseError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = read_source(path)?;
    let (front, body) = parse_front_matter(&text);
    let (title, body) = extract_title(&front, &body);
    let converted = converter.convert(&normalize_list_spacing(&body), depth);
    Ok(Some(AboutPage {
        title,
        html: fix_relative_img_src(&converted.html, "."),
        toc_html: converted.toc_html,
    }))
}
