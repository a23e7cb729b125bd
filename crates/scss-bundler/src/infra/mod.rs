//! Infrastructure adapters for filesystem access, glob expansion, config, and logging.

pub mod config;
pub mod fs;
pub mod glob;
pub mod logging;
