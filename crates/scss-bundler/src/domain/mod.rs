//! Domain types shared by the bundler, the locator and the output layer.

pub mod errors;
pub mod model;
