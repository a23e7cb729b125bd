//! Textual scanning of `@import` directives.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::ImportMatch;

pub const DEFAULT_FILE_EXTENSION: &str = ".scss";
pub const CSS_FILE_EXTENSION: &str = ".css";
pub const ALLOWED_FILE_EXTENSIONS: [&str; 2] = [DEFAULT_FILE_EXTENSION, CSS_FILE_EXTENSION];
pub const NODE_MODULES: &str = "node_modules";
pub const TILDE: &str = "~";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

static IMPORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@import\s+['"](.+)['"];"#).expect("valid import pattern"));
static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)//.*$").expect("valid line comment pattern"));
static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment pattern"));

/// Every import directive in `text`, left to right.
pub fn find_imports(text: &str) -> Vec<ImportMatch> {
    IMPORT_PATTERN
        .captures_iter(text)
        .map(|caps| ImportMatch {
            directive: caps[0].to_owned(),
            path: caps[1].to_owned(),
        })
        .collect()
}

/// Blank out directives inside comments; the rest of each comment is kept.
pub fn strip_commented_imports(text: &str) -> String {
    let mut text = text.to_owned();
    for pattern in [&*LINE_COMMENT, &*BLOCK_COMMENT] {
        text = pattern
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                IMPORT_PATTERN.replace_all(&caps[0], "").into_owned()
            })
            .into_owned();
    }
    text
}

/// Whether an import name already carries a style extension anywhere in it.
pub fn has_style_extension(import_name: &str) -> bool {
    ALLOWED_FILE_EXTENSIONS
        .iter()
        .any(|extension| import_name.contains(extension))
}

/// Replace the last occurrence of `needle` in `content`.
pub fn replace_last_occurrence(content: &str, needle: &str, replacement: &str) -> String {
    match content.rfind(needle) {
        Some(index) => {
            let mut replaced = String::with_capacity(content.len() + replacement.len());
            replaced.push_str(&content[..index]);
            replaced.push_str(replacement);
            replaced.push_str(&content[index + needle.len()..]);
            replaced
        }
        None => content.to_owned(),
    }
}

/// Diagnostic inserted where a located import has no content to inline.
pub fn not_found_marker(import_string: &str) -> String {
    format!("/*** IMPORTED FILE NOT FOUND ***/{LINE_ENDING}{import_string}/*** --- ***/")
}
