//! Shared types passed between the build stages.
//!
//! A source file becomes a [`ContentDocument`] in the content pipeline, gets
//! a slug from the slug resolver, and reaches the renderer as a [`Post`].
//! Drafts stop after slug resolution: they keep their slug in the lock file
//! but never produce output.

use crate::content::PostDate;

/// Metadata every document carries, draft or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    /// Project-relative source path with `/` separators. Identity key.
    pub source: String,
    pub hash: String,
    pub title: String,
    pub date: PostDate,
    pub updated: PostDate,
    pub categories: Vec<String>,
    pub archives: Vec<String>,
    /// Normalized `slug` front-matter value, if one was given.
    pub explicit_slug: Option<String>,
    /// Slug derived from the filename stem.
    pub stem_slug: String,
}

impl PostMeta {
    /// The slug this document asks for before collision handling.
    pub fn candidate_slug(&self) -> &str {
        self.explicit_slug.as_deref().unwrap_or(&self.stem_slug)
    }
}

/// Converted body of a published document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    pub toc_html: String,
    pub summary: String,
    pub words: usize,
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDocument {
    Published { meta: PostMeta, body: RenderedBody },
    Draft { meta: PostMeta },
}

impl ContentDocument {
    pub fn meta(&self) -> &PostMeta {
        match self {
            Self::Published { meta, .. } | Self::Draft { meta } => meta,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft { .. })
    }
}

/// A published document with its resolved slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub meta: PostMeta,
    pub body: RenderedBody,
}
