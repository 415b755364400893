//! Shared types, error model, and configuration for linkpost.
//!
//! This crate is the foundation depended on by all other linkpost crates.
//! It provides:
//! - [`LinkpostError`]: the unified error type
//! - Domain types ([`SourceRecord`], [`Collection`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_CONTENT_PATH, DEFAULT_MAX_ERRORS, DefaultsConfig, FeedConfig, LinksConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LinkpostError, Result};
pub use types::{Collection, RunId, SourceRecord};
