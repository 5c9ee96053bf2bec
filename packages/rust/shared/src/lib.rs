//! Shared types, error model, and configuration for webcard.
//!
//! This crate is the foundation depended on by all other webcard crates.
//! It provides:
//! - [`WebcardError`] — the unified error type
//! - Domain types ([`Domain`], [`ContentPointer`], [`Profile`], [`MergedProfile`], …)
//! - Configuration ([`AppConfig`], [`ServiceTable`], config loading)
//! - RDF [`vocab`]ulary constants

pub mod config;
pub mod error;
pub mod types;
pub mod vocab;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, NotifyConfig, ResolverConfig, ServiceDescriptor, ServiceTable, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ErrorKind, Result, WebcardError};
pub use types::{
    ContentPointer, ContentType, Document, Domain, FieldSpec, MergedField, MergedProfile,
    NO_NAME_FOUND, Profile, Resolution, ResolutionOutcome, RunId, SecondaryProfile, SocialLink,
    SourceTag, values_conflict,
};
