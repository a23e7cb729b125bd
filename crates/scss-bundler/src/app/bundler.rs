//! Recursive import inlining with a per-session memoizing cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use regex::Regex;

use crate::app::directives::{
    find_imports, not_found_marker, replace_last_occurrence, strip_commented_imports,
};
use crate::app::locator::ImportLocator;
use crate::domain::errors::BundleError;
use crate::domain::model::{BundleResult, ImportDirective};
use crate::infra::fs::{DiskFileSystem, FileSystem, absolutize, resolve_path};
use crate::infra::glob::glob_files_or_empty;

/// Bundled text per absolute file path.
///
/// A `None` value marks a path that is registered without content; it is treated as not yet
/// cached. The first content written for a path wins until that file finishes bundling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRegistry {
    entries: HashMap<PathBuf, Option<String>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with known contents, e.g. from a previous session.
    pub fn seeded<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Option<String>)>,
        P: AsRef<Path>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(path, content)| (absolutize(path), content))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: Option<String>) {
        self.entries.insert(path.into(), content);
    }

    pub fn content(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).and_then(|content| content.as_deref())
    }

    /// Whether `path` has content; registered-but-empty entries do not count.
    pub fn contains(&self, path: &Path) -> bool {
        self.content(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register_if_absent(&mut self, path: &Path, content: &str) {
        if !self.contains(path) {
            self.entries
                .insert(path.to_path_buf(), Some(content.to_owned()));
        }
    }
}

/// Per-call parameters threaded through the recursion.
#[derive(Debug, Clone, Default)]
pub struct BundleRules {
    /// Absolute paths inlined at most once across the tree.
    pub dedupe_files: Vec<PathBuf>,
    /// Fallback directories, tried in order.
    pub include_paths: Vec<PathBuf>,
    pub ignored_imports: Vec<Regex>,
}

impl BundleRules {
    /// Compile ignore patterns; an invalid expression fails the whole set.
    pub fn new(
        dedupe_files: Vec<PathBuf>,
        include_paths: Vec<PathBuf>,
        ignored_imports: &[String],
    ) -> Result<Self, BundleError> {
        let ignored_imports = ignored_imports
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| BundleError::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dedupe_files,
            include_paths,
            ignored_imports,
        })
    }

    fn should_check_for_dedupes(&self) -> bool {
        !self.dedupe_files.is_empty()
    }

    fn is_deduped(&self, path: &Path) -> bool {
        self.dedupe_files.iter().any(|file| file == path)
    }
}

/// Inlines `@import` directives recursively, sharing its caches across every call.
pub struct Bundler {
    fs: Arc<dyn FileSystem>,
    project_directory: Option<PathBuf>,
    registry: FileRegistry,
    /// Occurrence count per imported path across the whole session.
    used_imports: HashMap<PathBuf, usize>,
    /// Child results recorded the first time each file was bundled.
    imports_by_file: HashMap<PathBuf, Vec<BundleResult>>,
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Bundler {
    /// Create a bundler with an empty registry reading from disk.
    pub fn new(project_directory: Option<PathBuf>) -> Self {
        Self::with_registry(FileRegistry::new(), project_directory)
    }

    /// Create a bundler reusing an existing registry.
    pub fn with_registry(registry: FileRegistry, project_directory: Option<PathBuf>) -> Self {
        Self {
            fs: Arc::new(DiskFileSystem),
            project_directory: project_directory.map(absolutize),
            registry,
            used_imports: HashMap::new(),
            imports_by_file: HashMap::new(),
        }
    }

    /// Replace the filesystem facade.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn project_directory(&self) -> Option<&Path> {
        self.project_directory.as_deref()
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> FileRegistry {
        self.registry
    }

    /// How many times `path` was referenced as an import so far.
    pub fn usage_count(&self, path: &Path) -> Option<usize> {
        self.used_imports.get(path).copied()
    }

    /// Children recorded when `path` was first bundled.
    pub fn imports_of(&self, path: &Path) -> Option<&[BundleResult]> {
        self.imports_by_file.get(path).map(Vec::as_slice)
    }

    /// Bundle each entry independently on the shared caches, in input order.
    pub fn bundle_all<P: AsRef<Path>>(
        &mut self,
        entries: &[P],
        dedupe_globs: &[String],
    ) -> Vec<BundleResult> {
        self.bundle_all_with(entries, dedupe_globs, &[], &[])
    }

    /// [`Bundler::bundle_all`] with include paths and ignored imports.
    pub fn bundle_all_with<P: AsRef<Path>>(
        &mut self,
        entries: &[P],
        dedupe_globs: &[String],
        include_paths: &[PathBuf],
        ignored_imports: &[String],
    ) -> Vec<BundleResult> {
        entries
            .iter()
            .map(|entry| self.bundle(entry.as_ref(), dedupe_globs, include_paths, ignored_imports))
            .collect()
    }

    /// Bundle one entry file; any failure degrades to a `found: false` result.
    pub fn bundle(
        &mut self,
        entry: &Path,
        dedupe_globs: &[String],
        include_paths: &[PathBuf],
        ignored_imports: &[String],
    ) -> BundleResult {
        match self.try_bundle(entry, dedupe_globs, include_paths, ignored_imports) {
            Ok(result) => result,
            Err(err) => {
                // Without a project directory the caller's path is reported as given.
                let file = match &self.project_directory {
                    Some(project) => resolve_path(project, entry),
                    None => entry.to_path_buf(),
                };
                tracing::warn!(path = %file.display(), error = %err, "bundling failed");
                BundleResult::not_found(file)
            }
        }
    }

    /// Bundle one entry file, reporting why it failed.
    pub fn try_bundle(
        &mut self,
        entry: &Path,
        dedupe_globs: &[String],
        include_paths: &[PathBuf],
        ignored_imports: &[String],
    ) -> Result<BundleResult, BundleError> {
        let file = self.entry_path(entry);
        self.fs
            .access(&file)
            .map_err(|source| BundleError::EntryUnreachable {
                path: file.clone(),
                source,
            })?;
        let content = self.read(&file)?;

        let glob_base = match &self.project_directory {
            Some(project) => project.clone(),
            None => absolutize("."),
        };
        let dedupe_files = glob_files_or_empty(dedupe_globs, &glob_base)?;
        let rules = BundleRules::new(dedupe_files, include_paths.to_vec(), ignored_imports)?;

        self.bundle_file(&file, &content, &rules)
    }

    /// Inline every import of `content`, recursing into files not yet in the registry.
    pub fn bundle_file(
        &mut self,
        path: &Path,
        content: &str,
        rules: &BundleRules,
    ) -> Result<BundleResult, BundleError> {
        let mut content = strip_commented_imports(content);
        let file_path = absolutize(path);
        let dirname = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| file_path.clone());

        self.registry.register_if_absent(&file_path, &content);

        let directives = self.locate_imports(&content, &dirname, rules);

        let mut current_imports = Vec::with_capacity(directives.len());
        for directive in directives {
            let mut current = if !directive.found {
                tracing::warn!(
                    import = %directive.import_string,
                    importer = %file_path.display(),
                    "import not found"
                );
                BundleResult {
                    file_path: directive.full_path.clone(),
                    tilde: directive.tilde,
                    found: false,
                    ignored: directive.ignored,
                    ..BundleResult::default()
                }
            } else if !self.registry.contains(&directive.full_path) {
                let import_content = self.read(&directive.full_path)?;
                let mut bundled = self.bundle_file(&directive.full_path, &import_content, rules)?;
                self.registry
                    .insert(directive.full_path.clone(), bundled.bundled_content.clone());
                self.used_imports
                    .entry(directive.full_path.clone())
                    .or_insert(1);
                bundled.tilde = directive.tilde;
                bundled.ignored = directive.ignored;
                bundled
            } else {
                *self
                    .used_imports
                    .entry(directive.full_path.clone())
                    .or_insert(0) += 1;
                BundleResult {
                    file_path: directive.full_path.clone(),
                    tilde: directive.tilde,
                    found: true,
                    ignored: directive.ignored,
                    imports: self.imports_by_file.get(&directive.full_path).cloned(),
                    ..BundleResult::default()
                }
            };

            let replacement = self.replacement_for(&directive, &mut current, rules);
            content = replace_last_occurrence(&content, &directive.import_string, &replacement);
            current_imports.push(current);
        }

        self.imports_by_file
            .insert(file_path.clone(), current_imports.clone());

        Ok(BundleResult {
            file_path,
            found: true,
            bundled_content: Some(content),
            imports: Some(current_imports),
            ..BundleResult::default()
        })
    }

    /// Resolve every directive of one file concurrently; results keep source order.
    fn locate_imports(
        &self,
        content: &str,
        dirname: &Path,
        rules: &BundleRules,
    ) -> Vec<ImportDirective> {
        let locator = ImportLocator::new(
            self.fs.as_ref(),
            self.project_directory.as_deref(),
            &rules.include_paths,
            &rules.ignored_imports,
        );
        find_imports(content)
            .par_iter()
            .map(|import| locator.locate(import, dirname))
            .collect()
    }

    /// Text substituted for `directive` after its result node was built.
    fn replacement_for(
        &self,
        directive: &ImportDirective,
        current: &mut BundleResult,
        rules: &BundleRules,
    ) -> String {
        let times_used = self.usage_count(&directive.full_path);

        if directive.ignored {
            return match times_used {
                Some(count) if count > 1 => String::new(),
                _ => directive.import_string.clone(),
            };
        }

        if directive.found
            && rules.should_check_for_dedupes()
            && rules.is_deduped(&directive.full_path)
            && times_used.is_some_and(|count| count > 1)
        {
            current.deduped = true;
            return String::new();
        }

        match self
            .registry
            .content(&directive.full_path)
            .filter(|_| directive.found)
        {
            Some(bundled) => bundled.to_owned(),
            None => not_found_marker(&directive.import_string),
        }
    }

    fn entry_path(&self, entry: &Path) -> PathBuf {
        match &self.project_directory {
            Some(project) => resolve_path(project, entry),
            None => absolutize(entry),
        }
    }

    fn read(&self, path: &Path) -> Result<String, BundleError> {
        self.fs
            .read_to_string(path)
            .map_err(|source| BundleError::Read {
                path: path.to_path_buf(),
                source,
            })
    }
}
