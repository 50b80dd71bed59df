//! Shared test utilities for the simple-blog test suite.
//!
//! Builds throwaway projects on disk so orchestration tests can run real
//! builds against them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let project = TestProject::new();
//! project.post("hello", &[("date", "2026-01-10")], "Hello body");
//!
//! build_site(&project.options(at(2026, 2, 1))).unwrap();
//! assert!(project.output_path("posts/hello.html").exists());
//! ```

use crate::builder::BuildOptions;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal layout exercising every placeholder.
pub const BASE_TEMPLATE: &str = "<!doctype html>
<html>
<head><title>{{title}}</title><link rel=\"stylesheet\" href=\"{{root}}/css/site.css\">{{extra_head}}</head>
<body>
{{analytics}}
<header>{{site_name}}: {{site_description}}</header>
<main>{{content}}</main>
<aside>{{sidebar}}</aside>
<footer>{{year}}</footer>
</body>
</html>
";

/// Generator fingerprint used by every test build.
pub const GENERATOR: &str = "test-generator";

/// Midnight on the given day.
pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

// =========================================================================
// Project fixture
// =========================================================================

/// A project directory with `posts/`, `templates/base.html`, and one static
/// stylesheet. No `site.toml`, so every build uses the defaults.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(project.root().join("posts")).unwrap();
        project.write("templates/base.html", BASE_TEMPLATE);
        project.write("static/css/site.css", "body { margin: 0 }");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `text` to a project-relative path, creating parents.
    pub fn write(&self, rel: &str, text: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    /// Write `posts/<name>.md` with the given front matter.
    pub fn post(&self, name: &str, front: &[(&str, &str)], body: &str) {
        let mut text = String::from("---\n");
        for (key, value) in front {
            text.push_str(&format!("{key}: {value}\n"));
        }
        text.push_str("---\n\n");
        text.push_str(body);
        text.push('\n');
        self.write(&format!("posts/{name}.md"), &text);
    }

    /// Path under the default output directory.
    pub fn output_path(&self, rel: &str) -> PathBuf {
        self.root().join("dist").join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output_path(rel))
            .unwrap_or_else(|e| panic!("cannot read output {rel}: {e}"))
    }

    pub fn options(&self, now: NaiveDateTime) -> BuildOptions {
        BuildOptions::new(self.root(), GENERATOR, now)
    }
}
