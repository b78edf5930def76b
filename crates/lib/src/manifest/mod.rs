//! Build manifest.
//!
//! The manifest is a single JSON document mapping
//! `platform -> package -> BuildRecord`. It is the only durable state this
//! crate keeps: the build orchestrator upserts into it, the publisher reads
//! it to find artifacts.

mod store;
mod types;

pub use store::{ManifestError, ManifestStore, StaleEntry};
pub use types::*;
