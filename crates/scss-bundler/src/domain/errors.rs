//! Domain-specific errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("entry file {} is not accessible", path.display())]
    EntryUnreachable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid ignored import pattern '{pattern}'")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid dedupe glob '{pattern}'")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to walk dedupe glob directories")]
    Walk(#[from] ignore::Error),
    #[error("{} has no bundled content", path.display())]
    MissingContent { path: PathBuf },
    #[error("failed to write bundle to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
