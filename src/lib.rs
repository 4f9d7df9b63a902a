//! Digest Archive Importer Library
//!
//! This library provides the pieces of the backup import pipeline:
//! - Extract chat digest files from gzip tar backup archives
//! - Fold digest records into a deduplicating accumulation map
//! - Enrich unique senders with profile-page avatar URLs
//! - Recreate and fill the MySQL destination table

pub mod archive;
pub mod avatar;
pub mod config;
pub mod digest;
pub mod error;
pub mod pipeline;
pub mod sink;

// Re-export common types
pub use avatar::{AvatarClient, AvatarLookup, NO_AVATAR};
pub use config::{DbConfig, DEFAULT_CONFIG_FILE, DIGEST_FILE};
pub use digest::{AccumulationMap, DigestRecord, MessageEntry, Mode};
pub use error::{Error, Result};
