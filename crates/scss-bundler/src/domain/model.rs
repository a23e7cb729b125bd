//! Domain models for import directives and bundle trees.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// One textual `@import` match found while scanning a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMatch {
    /// Full directive text, e.g. `@import "vars";`.
    pub directive: String,
    /// Path captured between the quotes.
    pub path: String,
}

/// An import directive after its name was derived and resolved against the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// Directive text as it appears in the importing file.
    pub import_string: String,
    /// Derived import name (extension appended, package-root prefix rewritten).
    pub path: String,
    /// Whether the declared path used the `~` package-root notation.
    pub tilde: bool,
    /// Absolute path of the best candidate so far.
    pub full_path: PathBuf,
    pub found: bool,
    pub ignored: bool,
}

/// Output node of the recursion, one per file in the static import graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResult {
    pub file_path: PathBuf,
    pub found: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deduped: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tilde: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundled_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<BundleResult>>,
}

impl BundleResult {
    /// Result for a file that could not be accessed.
    pub fn not_found(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            found: false,
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Child results in source order; empty when none were recorded.
    pub fn children(&self) -> &[BundleResult] {
        self.imports.as_deref().unwrap_or_default()
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Depth-first, pre-order iteration over this node and all its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Iterator returned by [`BundleResult::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a BundleResult>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a BundleResult;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Aggregate counters over a bundle tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BundleStats {
    /// Distinct files that were found.
    pub files: usize,
    /// Import directives, excluding the root node.
    pub imports: usize,
    pub not_found: usize,
    pub deduped: usize,
    pub ignored: usize,
}

impl BundleStats {
    pub fn collect(result: &BundleResult) -> Self {
        let mut stats = Self::default();
        let mut seen = std::collections::HashSet::new();
        for (index, node) in result.walk().enumerate() {
            if index > 0 {
                stats.imports += 1;
            }
            if !node.found {
                stats.not_found += 1;
            } else if seen.insert(node.file_path.as_path()) {
                stats.files += 1;
            }
            if node.deduped {
                stats.deduped += 1;
            }
            if node.ignored {
                stats.ignored += 1;
            }
        }
        stats
    }
}
