//! Configuration module for site-backup
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every table has defaults, so an empty file is valid.
//!
//! # Example
//!
//! ```no_run
//! use site_backup::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("backup.toml")).unwrap();
//! println!("Mirror writes to: {}", config.mirror.download_dir.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, LoggingConfig, MirrorConfig, NotifyConfig, ReconcileConfig, UploadConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
