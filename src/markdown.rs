//! Markdown to HTML conversion with a table of contents.
//!
//! The build treats conversion as a pure function behind the
//! [`MarkdownConverter`] trait: body text and a heading depth range in,
//! HTML and TOC HTML out. Implementations must not carry state from one
//! call to the next, because the content pipeline calls a single shared
//! converter from every worker thread.
//!
//! [`CmarkConverter`] is the production implementation on top of
//! `pulldown-cmark`. Every heading gets a unique `id` derived from its text,
//! and headings inside the configured depth range are listed in a nested
//! `<ul>` wrapped in `<div class="toc">`.

use crate::content::slugify;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Inclusive range of heading levels listed in the TOC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocDepth {
    pub min: u8,
    pub max: u8,
}

impl Default for TocDepth {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

impl TocDepth {
    pub fn contains(&self, level: u8) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

impl FromStr for TocDepth {
    type Err = String;

    /// `"2-4"` → levels 2 through 4; `"3"` → levels 1 through 3.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| -> Result<u8, String> {
            let n: u8 = v
                .trim()
                .parse()
                .map_err(|_| format!("invalid heading level '{v}'"))?;
            if (1..=6).contains(&n) {
                Ok(n)
            } else {
                Err(format!("heading level {n} out of range 1-6"))
            }
        };
        let (min, max) = match s.split_once('-') {
            Some((lo, hi)) => (parse(lo)?, parse(hi)?),
            None => (1, parse(s)?),
        };
        if min > max {
            return Err(format!("empty heading range '{s}'"));
        }
        Ok(Self { min, max })
    }
}

impl fmt::Display for TocDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Result of converting one Markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Converted {
    pub html: String,
    /// Empty when no heading falls inside the depth range.
    pub toc_html: String,
}

/// A stateless Markdown renderer.
pub trait MarkdownConverter: Sync {
    fn convert(&self, body: &str, depth: TocDepth) -> Converted;
}

/// `pulldown-cmark` with tables, footnotes, strikethrough, and task lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmarkConverter;

struct TocEntry {
    level: u8,
    id: String,
    text: String,
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

impl MarkdownConverter for CmarkConverter {
    fn convert(&self, body: &str, depth: TocDepth) -> Converted {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let mut events: Vec<Event> = Parser::new_ext(body, options).collect();

        let mut used_ids: HashMap<String, usize> = HashMap::new();
        let mut toc = Vec::new();
        let mut i = 0;
        while i < events.len() {
            let Event::Start(Tag::Heading { level, id, .. }) = &events[i] else {
                i += 1;
                continue;
            };
            let level = level_number(*level);
            let explicit = id.as_ref().map(|s| s.to_string());
            let end = events[i..]
                .iter()
                .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
                .map(|p| i + p)
                .unwrap_or(events.len());

            let text: String = events[i + 1..end]
                .iter()
                .filter_map(|e| match e {
                    Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                    _ => None,
                })
                .collect();
            let id = unique_id(explicit.unwrap_or_else(|| slugify(&text)), &mut used_ids);

            if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
                *slot = Some(CowStr::from(id.clone()));
            }
            if depth.contains(level) {
                toc.push(TocEntry { level, id, text });
            }
            i = end + 1;
        }

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        Converted {
            html: out,
            toc_html: render_toc(&toc),
        }
    }
}

/// `base`, or `base-1`, `base-2`, … when already used in this document.
fn unique_id(base: String, used: &mut HashMap<String, usize>) -> String {
    match used.get_mut(&base) {
        None => {
            used.insert(base.clone(), 0);
            base
        }
        Some(n) => {
            *n += 1;
            let id = format!("{base}-{n}");
            used.insert(id.clone(), 0);
            id
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render TOC entries as nested lists, relative to the shallowest level.
fn render_toc(entries: &[TocEntry]) -> String {
    let Some(base) = entries.iter().map(|e| e.level).min() else {
        return String::new();
    };
    let mut out = String::from("<div class=\"toc\">\n");
    let mut open = 0usize;
    for entry in entries {
        let target = usize::from(entry.level - base) + 1;
        if target > open {
            while open < target {
                out.push_str("<ul>");
                open += 1;
            }
        } else {
            out.push_str("</li>");
            while open > target {
                out.push_str("</ul></li>");
                open -= 1;
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&entry.id),
            escape_html(&entry.text)
        ));
    }
    out.push_str("</li>");
    while open > 1 {
        out.push_str("</ul></li>");
        open -= 1;
    }
    out.push_str("</ul>\n</div>\n");
    out
}
