//! Expansion of dedupe glob patterns into absolute file paths.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::domain::errors::BundleError;
use crate::infra::fs::resolve_path;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Expand `patterns` into the absolute paths of every matching file.
///
/// An empty pattern list resolves to an empty list without touching the filesystem. Relative
/// patterns are anchored at `base`.
pub fn glob_files_or_empty(patterns: &[String], base: &Path) -> Result<Vec<PathBuf>, BundleError> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = GlobSetBuilder::new();
    let mut roots = BTreeSet::new();
    for pattern in patterns {
        let anchored = anchor_pattern(pattern, base);
        let glob = GlobBuilder::new(&anchored)
            .literal_separator(true)
            .build()
            .map_err(|source| BundleError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
        roots.insert(literal_prefix(Path::new(&anchored)));
    }
    let set = builder.build().map_err(|source| BundleError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })?;

    let mut files = BTreeSet::new();
    for root in &roots {
        collect_matches(root, &set, &mut files)?;
    }
    tracing::debug!(patterns = ?patterns, matched = files.len(), "expanded dedupe globs");
    Ok(files.into_iter().collect())
}

fn collect_matches(
    root: &Path,
    set: &GlobSet,
    files: &mut BTreeSet<PathBuf>,
) -> Result<(), BundleError> {
    if !root.exists() {
        return Ok(());
    }
    let walker = WalkBuilder::new(root).standard_filters(false).build();
    for entry in walker {
        let entry = entry?;
        let is_file = entry.file_type().is_some_and(|kind| kind.is_file());
        if is_file && set.is_match(entry.path()) {
            files.insert(path_clean::clean(entry.path()));
        }
    }
    Ok(())
}

fn anchor_pattern(pattern: &str, base: &Path) -> String {
    let anchored = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        resolve_path(base, pattern)
    };
    anchored.to_string_lossy().into_owned()
}

/// Longest leading directory of `pattern` without glob metacharacters.
fn literal_prefix(pattern: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in pattern.components() {
        if let Component::Normal(part) = component
            && part.to_string_lossy().contains(GLOB_META)
        {
            return prefix;
        }
        prefix.push(component);
    }
    // A pattern without metacharacters names a single file; walk its directory.
    prefix.parent().map(Path::to_path_buf).unwrap_or(prefix)
}
