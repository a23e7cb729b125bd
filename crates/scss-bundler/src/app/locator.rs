//! Derivation and filesystem resolution of import directives.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::app::directives::{
    CSS_FILE_EXTENSION, DEFAULT_FILE_EXTENSION, NODE_MODULES, TILDE, has_style_extension,
};
use crate::domain::model::{ImportDirective, ImportMatch};
use crate::infra::fs::{FileSystem, absolutize, resolve_path};

/// Resolves the directives of one file against the filesystem.
///
/// The locator only reads through the [`FileSystem`] facade, so one instance can be shared by
/// the workers resolving directives concurrently.
#[derive(Clone, Copy)]
pub struct ImportLocator<'a> {
    fs: &'a dyn FileSystem,
    project_directory: Option<&'a Path>,
    include_paths: &'a [PathBuf],
    ignored_imports: &'a [Regex],
}

impl<'a> ImportLocator<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        project_directory: Option<&'a Path>,
        include_paths: &'a [PathBuf],
        ignored_imports: &'a [Regex],
    ) -> Self {
        Self {
            fs,
            project_directory,
            include_paths,
            ignored_imports,
        }
    }

    /// Derive the import name for `import` and resolve it relative to `importer_dir`.
    pub fn locate(&self, import: &ImportMatch, importer_dir: &Path) -> ImportDirective {
        let mut directive = self.derive(import, importer_dir);
        self.resolve(&mut directive, self.include_paths);
        tracing::debug!(
            import = %directive.path,
            path = %directive.full_path.display(),
            found = directive.found,
            ignored = directive.ignored,
            "located import"
        );
        directive
    }

    /// Build the unresolved directive: extension inference, ignore matching, `~` rewriting.
    pub fn derive(&self, import: &ImportMatch, importer_dir: &Path) -> ImportDirective {
        let mut import_name = import.path.clone();
        if !has_style_extension(&import_name) {
            import_name.push_str(DEFAULT_FILE_EXTENSION);
        }

        let ignored = self
            .ignored_imports
            .iter()
            .any(|pattern| pattern.is_match(&import_name));

        let tilde = import_name.starts_with(TILDE);
        let full_path = match self.project_directory {
            Some(project) if tilde => {
                import_name = format!("./{NODE_MODULES}/{}", &import_name[TILDE.len()..]);
                resolve_path(project, &import_name)
            }
            _ => resolve_path(importer_dir, &import_name),
        };

        ImportDirective {
            import_string: import.directive.clone(),
            path: import_name,
            tilde,
            full_path,
            found: false,
            ignored,
        }
    }

    /// Try the candidate locations in order, stopping at the first accessible one.
    ///
    /// The full path is tried as-is, then as an underscore partial, then as a `.css` sibling.
    /// Failing all three, the declared path is re-resolved against the first include path and
    /// the same chain runs again with the remaining include paths.
    pub fn resolve(&self, directive: &mut ImportDirective, include_paths: &[PathBuf]) {
        if self.accessible(&directive.full_path) {
            directive.found = true;
            return;
        }

        let partial = partial_path(&directive.full_path);
        if self.accessible(&partial) {
            directive.full_path = partial;
            directive.found = true;
            return;
        }

        let css = css_sibling(&directive.full_path);
        if self.accessible(&css) {
            directive.full_path = css;
            directive.found = true;
            return;
        }

        if let Some((first, remaining)) = include_paths.split_first() {
            directive.full_path = resolve_path(&absolutize(first), &directive.path);
            self.resolve(directive, remaining);
        }
    }

    fn accessible(&self, path: &Path) -> bool {
        self.fs.access(path).is_ok()
    }
}

/// `dir/name.scss` becomes `dir/_name.scss`.
fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("_{file_name}"))
}

/// Every `.scss` in the path becomes `.css`.
fn css_sibling(path: &Path) -> PathBuf {
    PathBuf::from(
        path.to_string_lossy()
            .replace(DEFAULT_FILE_EXTENSION, CSS_FILE_EXTENSION),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fs::DiskFileSystem;
    use std::fs;

    fn import(path: &str) -> ImportMatch {
        ImportMatch {
            directive: format!("@import \"{path}\";"),
            path: path.to_owned(),
        }
    }

    fn root_of(temp: &tempfile::TempDir) -> PathBuf {
        path_clean::clean(temp.path())
    }

    #[test]
    fn appends_default_extension_when_missing() {
        let locator = ImportLocator::new(&DiskFileSystem, None, &[], &[]);
        let directive = locator.derive(&import("mixins/grid"), Path::new("/site/styles"));
        assert_eq!(directive.path, "mixins/grid.scss");
        assert_eq!(
            directive.full_path,
            PathBuf::from("/site/styles/mixins/grid.scss")
        );
        assert!(!directive.tilde);

        let directive = locator.derive(&import("reset.css"), Path::new("/site"));
        assert_eq!(directive.path, "reset.css");
    }

    #[test]
    fn rewrites_tilde_imports_into_node_modules() {
        let project = Path::new("/site");
        let locator = ImportLocator::new(&DiskFileSystem, Some(project), &[], &[]);
        let directive = locator.derive(&import("~bootstrap/scss/grid"), Path::new("/site/a/b"));
        assert!(directive.tilde);
        assert_eq!(directive.path, "./node_modules/bootstrap/scss/grid.scss");
        assert_eq!(
            directive.full_path,
            PathBuf::from("/site/node_modules/bootstrap/scss/grid.scss")
        );
    }

    #[test]
    fn tilde_without_project_directory_stays_relative() {
        let locator = ImportLocator::new(&DiskFileSystem, None, &[], &[]);
        let directive = locator.derive(&import("~lib"), Path::new("/site"));
        assert!(directive.tilde);
        assert_eq!(directive.full_path, PathBuf::from("/site/~lib.scss"));
    }

    #[test]
    fn ignore_patterns_match_derived_name() -> anyhow::Result<()> {
        let patterns = vec![Regex::new(r"^vendor/.*\.scss$")?];
        let locator = ImportLocator::new(&DiskFileSystem, None, &[], &patterns);
        assert!(locator.derive(&import("vendor/theme"), Path::new("/")).ignored);
        assert!(!locator.derive(&import("theme"), Path::new("/")).ignored);
        Ok(())
    }

    #[test]
    fn falls_back_to_partial_then_css() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = root_of(&temp);
        fs::write(root.join("_vars.scss"), "$a: 1;")?;
        fs::write(root.join("reset.css"), "* {}")?;

        let locator = ImportLocator::new(&DiskFileSystem, None, &[], &[]);

        let vars = locator.locate(&import("vars"), &root);
        assert!(vars.found);
        assert_eq!(vars.full_path, root.join("_vars.scss"));

        let reset = locator.locate(&import("reset"), &root);
        assert!(reset.found);
        assert_eq!(reset.full_path, root.join("reset.css"));

        let missing = locator.locate(&import("missing"), &root);
        assert!(!missing.found);
        assert_eq!(missing.full_path, root.join("missing.scss"));
        Ok(())
    }

    #[test]
    fn include_paths_are_tried_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = root_of(&temp);
        fs::create_dir_all(root.join("src"))?;
        fs::create_dir_all(root.join("first"))?;
        fs::create_dir_all(root.join("second"))?;
        fs::write(root.join("second/_shared.scss"), "")?;

        let include_paths = vec![root.join("first"), root.join("second")];
        let locator = ImportLocator::new(&DiskFileSystem, None, &include_paths, &[]);

        let shared = locator.locate(&import("shared"), &root.join("src"));
        assert!(shared.found);
        assert_eq!(shared.full_path, root.join("second/_shared.scss"));

        let missing = locator.locate(&import("nowhere"), &root.join("src"));
        assert!(!missing.found);
        assert_eq!(missing.full_path, root.join("second/nowhere.scss"));
        Ok(())
    }

    #[test]
    fn partial_and_css_candidates() {
        assert_eq!(
            partial_path(Path::new("/a/b/grid.scss")),
            PathBuf::from("/a/b/_grid.scss")
        );
        assert_eq!(
            css_sibling(Path::new("/a/b/grid.scss")),
            PathBuf::from("/a/b/grid.css")
        );
    }
}
