//! Configuration module
//!
//! Loads server and bot settings from an optional TOML file.

mod settings;

pub use settings::*;
