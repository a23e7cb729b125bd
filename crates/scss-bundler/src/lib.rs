pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub use app::bundler::{BundleRules, Bundler, FileRegistry};
pub use domain::errors::BundleError;
pub use domain::model::{BundleResult, BundleStats, ImportDirective, ImportMatch};

/// Install the default stderr logger at `level` (overridden by `RUST_LOG`).
pub fn init(level: Option<&str>) {
    infra::logging::init(level);
}
