//! Shared types, error model, and configuration for rfcpub.
//!
//! This crate is the foundation depended on by all other rfcpub crates.
//! It provides:
//! - [`RfcPubError`], the unified error type
//! - Domain types ([`DraftRef`], [`PublishTarget`], [`ConversionPass`], [`Slug`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ConverterConfig, ConverterRuntime, PathsConfig, PublishConfig,
    SyncConfig, init_config, load_config, load_config_from,
};
pub use error::{Result, RfcPubError};
pub use types::{ConversionPass, DraftRef, PublishTarget, Slug};
