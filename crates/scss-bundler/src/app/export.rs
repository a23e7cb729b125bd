//! Writing bundles to disk and rendering import trees.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::errors::BundleError;
use crate::domain::model::BundleResult;

/// Write the root's bundled text to `dest`, creating parent directories as needed.
pub fn write_bundle(result: &BundleResult, dest: &Path) -> Result<PathBuf, BundleError> {
    let content = result
        .bundled_content
        .as_deref()
        .filter(|_| result.found)
        .ok_or_else(|| BundleError::MissingContent {
            path: result.file_path.clone(),
        })?;

    let write_err = |source| BundleError::Write {
        path: dest.to_path_buf(),
        source,
    };
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(dest, content).map_err(write_err)?;
    tracing::debug!(dest = %dest.display(), bytes = content.len(), "bundle written");
    Ok(dest.to_path_buf())
}

/// Output location for the `index`-th of `total` entries.
///
/// A single entry writes to `dest` itself; several entries treat `dest` as a directory and keep
/// each entry's file name.
pub fn output_path(dest: &Path, entry: &Path, total: usize) -> PathBuf {
    if total <= 1 {
        return dest.to_path_buf();
    }
    match entry.file_name() {
        Some(name) => dest.join(name),
        None => dest.join("bundle.scss"),
    }
}

/// Pretty JSON of the whole tree, bundled text included.
pub fn to_json(result: &BundleResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Render the import tree, showing paths relative to `base` where possible.
pub fn render_tree(result: &BundleResult, base: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", describe(result, base));
    render_children(result.children(), base, "", &mut out);
    out
}

fn render_children(children: &[BundleResult], base: Option<&Path>, prefix: &str, out: &mut String) {
    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(out, "{prefix}{branch}{}", describe(child, base));
        render_children(child.children(), base, &format!("{prefix}{indent}"), out);
    }
}

fn describe(node: &BundleResult, base: Option<&Path>) -> String {
    let mut label = display_path(&node.file_path, base);
    if node.tilde {
        label.push_str(" [~]");
    }
    if !node.found {
        label.push_str(" [not found]");
    }
    if node.ignored {
        label.push_str(" [ignored]");
    }
    if node.deduped {
        label.push_str(" [deduped]");
    }
    label
}

fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|base| path.strip_prefix(base).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bundle_creating_directories() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let dest = temp.path().join("dist/css/main.scss");
        let result = BundleResult {
            file_path: PathBuf::from("/src/main.scss"),
            found: true,
            bundled_content: Some(".a {}".into()),
            ..BundleResult::default()
        };

        write_bundle(&result, &dest)?;
        assert_eq!(fs::read_to_string(dest)?, ".a {}");
        Ok(())
    }

    #[test]
    fn refuses_to_write_missing_bundle() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let err = write_bundle(
            &BundleResult::not_found("/src/main.scss"),
            &temp.path().join("out.scss"),
        )
        .expect_err("nothing to write");
        assert!(matches!(err, BundleError::MissingContent { .. }));
        Ok(())
    }

    #[test]
    fn output_path_depends_on_entry_count() {
        let dest = Path::new("/out");
        let entry = Path::new("/src/theme.scss");
        assert_eq!(output_path(dest, entry, 1), PathBuf::from("/out"));
        assert_eq!(output_path(dest, entry, 3), PathBuf::from("/out/theme.scss"));
    }
}
