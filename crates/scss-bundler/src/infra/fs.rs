//! Filesystem facade used by the locator and the bundler.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Minimal filesystem contract required to resolve and inline imports.
///
/// Implementations must be shareable across the worker threads that resolve the directives of a
/// single file concurrently.
pub trait FileSystem: Send + Sync {
    /// Succeeds when `path` exists and can be accessed.
    fn access(&self, path: &Path) -> io::Result<()>;

    /// Read the whole file as text; invalid UTF-8 sequences become U+FFFD.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn access(&self, path: &Path) -> io::Result<()> {
        fs::metadata(path).map(|_| ())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tracing::trace!(path = %path.display(), "reading file");
        let bytes = fs::read(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        })
    }
}

/// Resolve `path` against `base` the way a shell would, without touching the filesystem.
///
/// Absolute paths are only cleaned; relative ones are joined to `base` first.
pub fn resolve_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    path_clean::clean(base.join(path.as_ref()))
}

/// Absolute, cleaned form of `path` relative to the current directory.
pub fn absolutize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path_clean::clean(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => resolve_path(&cwd, path),
        Err(_) => path_clean::clean(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_cleans_parent_segments() {
        let base = Path::new("/project/styles");
        assert_eq!(
            resolve_path(base, "../shared/./vars.scss"),
            PathBuf::from("/project/shared/vars.scss")
        );
        assert_eq!(
            resolve_path(base, "/abs/theme.scss"),
            PathBuf::from("/abs/theme.scss")
        );
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        assert_eq!(
            absolutize("/a/b/../c.scss"),
            PathBuf::from("/a/c.scss")
        );
        assert!(absolutize("relative.scss").is_absolute());
    }

    #[test]
    fn disk_access_reports_missing_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("present.scss");
        fs::write(&file, "a { color: red; }")?;

        let disk = DiskFileSystem;
        assert!(disk.access(&file).is_ok());
        assert!(disk.access(&temp.path().join("absent.scss")).is_err());
        assert_eq!(disk.read_to_string(&file)?, "a { color: red; }");
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("_vendor.scss");
        fs::write(&file, b"/* \xA9 vendor */\n.v {}")?;

        let text = DiskFileSystem.read_to_string(&file)?;
        assert_eq!(text, "/* \u{FFFD} vendor */\n.v {}");
        Ok(())
    }

    #[test]
    fn reading_a_directory_fails() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        assert!(DiskFileSystem.read_to_string(temp.path()).is_err());
        Ok(())
    }
}
