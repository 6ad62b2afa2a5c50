// src/config/mod.rs

//! Scheduler configuration: TOML model, loading and validation.
//!
//! - [`model`] holds the raw (deserialized) and validated config types.
//! - [`loader`] reads TOML from disk.
//! - [`validate`] turns a [`model::RawConfigFile`] into a
//!   [`model::ConfigFile`], rejecting bad lane layouts.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, LaneSection, RawConfigFile, ThreadsSection};
