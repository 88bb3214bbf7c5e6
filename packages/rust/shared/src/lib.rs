//! Shared types, error model, and configuration for Tramitero.
//!
//! This crate is the foundation depended on by all other Tramitero crates.
//! It provides:
//! - [`TramiteroError`] — the unified error type
//! - Domain types ([`RawRecord`], [`TramiteDoc`], [`DocMetadata`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EmbeddingsConfig, GroqConfig, IndexConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_groq_key,
};
pub use error::{Result, TramiteroError};
pub use types::{DocMetadata, IDENTITY_KEY, RawRecord, TramiteDoc};
