//! Application layer: directive scanning, import resolution, bundling, and output.

pub mod bundler;
pub mod directives;
pub mod export;
pub mod locator;
