//! Post source parsing: front matter, titles, dates, slugs, and text helpers.
//!
//! A post is a Markdown file with an optional front-matter block:
//!
//! ```text
//! ---
//! title: Bringing up the UART
//! date: 2026-01-10
//! time: 09:30
//! updated: 2026-02-01
//! categories: [Embedded, Notes]
//! archive: Board bring-up
//! slug: uart
//! draft: false
//! ---
//! Body text…
//! ```
//!
//! Every field is optional. Parsing is deliberately forgiving: unknown keys
//! are kept but ignored, malformed lines are skipped, and an unterminated
//! block is treated as body text.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

/// A single front-matter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

/// Keys whose values are parsed as lists.
const LIST_KEYS: &[&str] = &["categories", "tags", "archive"];

/// Parsed front matter. Keys are lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: HashMap<String, MetaValue>,
}

impl FrontMatter {
    /// A non-empty text value, trimmed.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(MetaValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// A non-empty list value.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(MetaValue::List(items)) if !items.is_empty() => Some(items),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.text(key).is_some_and(parse_bool)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Split a source file into front matter and body.
///
/// The block must start on the first line with `---` and end at the next
/// `---` line. Anything else is returned as body with empty front matter.
pub fn parse_front_matter(text: &str) -> (FrontMatter, String) {
    let clean = text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = clean.lines().collect();
    if lines.first().map(|l| l.trim()) != Some("---") {
        return (FrontMatter::default(), clean.to_string());
    }
    let Some(end) = lines
        .iter()
        .skip(1)
        .position(|l| l.trim() == "---")
        .map(|i| i + 1)
    else {
        return (FrontMatter::default(), clean.to_string());
    };

    let mut fields = HashMap::new();
    for line in &lines[1..end] {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        let parsed = if LIST_KEYS.contains(&key.as_str()) {
            MetaValue::List(parse_list(value))
        } else {
            MetaValue::Text(value.to_string())
        };
        fields.insert(key, parsed);
    }
    (FrontMatter { fields }, lines[end + 1..].join("\n"))
}

/// Parse `[a, "b"]` or `a, b` into trimmed, non-empty items.
pub fn parse_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lenient boolean: `1`, `true`, `yes`, `y`, `on` (any case).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Normalize text into a slug.
///
/// Lower-cases, collapses every run of non-alphanumeric characters
/// (underscores included) into a single `-`, and trims separators from both
/// ends. Unicode letters and digits are kept. Empty results become `post`.
///
/// - `"Hello, World!"` → `"hello-world"`
/// - `"2024_01_notes"` → `"2024-01-notes"`
/// - `"Ünïcode Täg"` → `"ünïcode-täg"`
/// - `"!!!"` → `"post"`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

/// Resolve the title and strip a leading `# Heading` used as one.
///
/// Priority: `title` front-matter key, then a `# Heading` on the first
/// non-blank body line, then `"Untitled"`.
pub fn extract_title(meta: &FrontMatter, body: &str) -> (String, String) {
    if let Some(title) = meta.text("title") {
        return (title.to_string(), body.to_string());
    }
    let lines: Vec<&str> = body.lines().collect();
    if let Some(i) = lines.iter().position(|l| !l.trim().is_empty()) {
        let first = lines[i].trim();
        if let Some(heading) = first.strip_prefix("# ") {
            let heading = heading.trim();
            let title = if heading.is_empty() {
                "Untitled".to_string()
            } else {
                heading.to_string()
            };
            let rest = lines[i + 1..].join("\n");
            return (title, rest.trim_start().to_string());
        }
    }
    ("Untitled".to_string(), body.to_string())
}

/// Categories for a post: `category`, else `categories`, else `tags`, else
/// `["General"]`.
pub fn categories(meta: &FrontMatter) -> Vec<String> {
    if let Some(c) = meta.text("category") {
        return vec![c.to_string()];
    }
    meta.list("categories")
        .or_else(|| meta.list("tags"))
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| vec!["General".to_string()])
}

/// A parsed date plus whether a time of day was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostDate {
    pub value: NaiveDateTime,
    pub has_time: bool,
}

impl PostDate {
    /// `YYYY-MM-DD HH:MM` when a time was given, else `YYYY-MM-DD`.
    pub fn display(&self) -> String {
        if self.has_time {
            self.value.format("%Y-%m-%d %H:%M").to_string()
        } else {
            self.value.format("%Y-%m-%d").to_string()
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Parse a date from a `date`-style key plus an optional `time` key.
///
/// Accepts `2026-01-10`, `2026-01-10 09:30`, `2026-01-10T09:30:00`, or a
/// date with a separate time value. Returns `None` when nothing parses.
pub fn parse_date_fields(date: Option<&str>, time: Option<&str>) -> Option<PostDate> {
    let date = date?.trim();
    if (date.contains('T') || date.contains(' '))
        && let Some(value) = parse_datetime(date)
    {
        return Some(PostDate {
            value,
            has_time: true,
        });
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    match time.and_then(parse_time) {
        Some(t) => Some(PostDate {
            value: day.and_time(t),
            has_time: true,
        }),
        None => Some(PostDate {
            value: day.and_time(NaiveTime::MIN),
            has_time: false,
        }),
    }
}

/// The post's primary date, falling back to the file modification time.
pub fn post_date(meta: &FrontMatter, modified: NaiveDateTime) -> PostDate {
    parse_date_fields(meta.text("date"), meta.text("time")).unwrap_or(PostDate {
        value: modified,
        has_time: true,
    })
}

/// The post's updated date (`updated` or `lastmod`), falling back to `date`.
pub fn updated_date(meta: &FrontMatter, date: PostDate) -> PostDate {
    parse_date_fields(meta.text("updated").or_else(|| meta.text("lastmod")), None).unwrap_or(date)
}

/// Column of a list marker (`-`, `+`, `*`, `1.`, `1)`) followed by whitespace.
fn list_marker_indent(line: &str) -> Option<usize> {
    let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
    let rest = &line[indent..];
    let after = if let Some(r) = rest.strip_prefix(['-', '+', '*']) {
        r
    } else {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        rest[digits..].strip_prefix(['.', ')'])?
    };
    after.starts_with([' ', '\t']).then_some(indent)
}

/// Opening/closing fence marker (```` ``` ```` or `~~~`, three or more).
fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then(|| &trimmed[..len])
}

/// Smooth over common Markdown authoring habits before conversion.
///
/// - `>>` at the start of a line is treated as a single `>` quote.
/// - A blank line is inserted before a top-level list item that directly
///   follows a paragraph line, so the list is not swallowed by it.
///
/// Fenced code blocks pass through untouched.
pub fn normalize_list_spacing(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut fence: Option<String> = None;

    for line in text.lines() {
        if let Some(marker) = fence_marker(line) {
            match &fence {
                None => fence = Some(marker.to_string()),
                Some(open) if open == marker => fence = None,
                Some(_) => {}
            }
            out.push(line.to_string());
            continue;
        }
        if fence.is_some() {
            out.push(line.to_string());
            continue;
        }

        let mut line = line.to_string();
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let (indent, rest) = line.split_at(indent_len);
        if let Some(quoted) = rest.strip_prefix(">>")
            && !quoted.starts_with('>')
        {
            let quoted = quoted.trim_start();
            line = if quoted.is_empty() {
                format!("{indent}>")
            } else {
                format!("{indent}> {quoted}")
            };
        }

        if list_marker_indent(&line) == Some(0)
            && let Some(prev) = out.last()
            && !prev.trim().is_empty()
            && list_marker_indent(prev).is_none()
        {
            out.push(String::new());
        }
        out.push(line);
    }
    out.join("\n")
}

/// Remove everything between `<` and `>`.
pub fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Decode the entities the Markdown renderer emits.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{4e00}'..='\u{9fff}'
        | '\u{ac00}'..='\u{d7af}')
}

/// Count words in plain text.
///
/// Each CJK character counts as one word. Other words are runs of ASCII
/// letters and digits, allowing one inner apostrophe (`don't`).
pub fn count_words(text: &str) -> usize {
    let text = unescape_html(text);
    let mut count = 0;
    let mut in_word = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_ascii_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else if c == '\'' && in_word && chars.peek().is_some_and(char::is_ascii_alphanumeric) {
            // apostrophe inside a word
        } else {
            in_word = false;
        }
    }
    count
}

/// Summary text: the tag-stripped HTML, single-lined, capped at `max` chars.
pub fn summarize(html: &str, max: usize) -> String {
    let plain = strip_tags(html).trim().replace('\n', " ");
    let plain = unescape_html(&plain);
    if plain.chars().count() <= max {
        plain
    } else {
        let cut: String = plain.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// Prefix relative `<img src>` values with `root`.
///
/// Absolute URLs, data URIs, fragments, root-relative, and explicitly
/// relative (`./`, `../`) sources are left as they are.
pub fn fix_relative_img_src(html: &str, root: &str) -> String {
    const SKIP: &[&str] = &["http://", "https://", "data:", "#", "/", "./", "../"];
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find("<img") {
        let (before, tag_on) = rest.split_at(start);
        out.push_str(before);
        let tag_end = tag_on.find('>').map(|i| i + 1).unwrap_or(tag_on.len());
        let (tag, after) = tag_on.split_at(tag_end);
        match tag.find("src=\"") {
            Some(pos) => {
                let value_start = pos + "src=\"".len();
                let value = &tag[value_start..];
                if SKIP.iter().any(|p| value.starts_with(p)) {
                    out.push_str(tag);
                } else {
                    out.push_str(&tag[..value_start]);
                    out.push_str(root);
                    out.push('/');
                    out.push_str(value);
                }
            }
            None => out.push_str(tag),
        }
        rest = after;
    }
    out.push_str(rest);
    out
}
