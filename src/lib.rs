//! media-sorter - copy a directory tree into category folders
//!
//! This library classifies files by extension, drops byte-identical
//! duplicates within each category, gives photos and videos sortable
//! date-based names and copies everything to collision-free paths under a
//! destination root. The source tree is never modified.
//!
//! Pipeline, leaf to root:
//! - `file_category` - extension to category
//! - `hasher` - streaming SHA-256 fingerprints
//! - `timestamp` - EXIF capture time with modification-time fallback
//! - `naming` - filename sanitation and date-prefixed names
//! - `path_allocator` - non-colliding destination paths
//! - `dedup` - per-run, per-category fingerprint index
//! - `file_organizer` - the orchestrator

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod hasher;
pub mod naming;
pub mod output;
pub mod path_allocator;
pub mod timestamp;

pub use config::{CompiledFilters, Config, ConfigError};
pub use error::{Error, OrganizeError, OrganizeResult};
pub use file_category::{Category, FileMapper};
pub use file_organizer::{FileCopier, FileOutcome, Organizer, RunReport, RunState};
pub use timestamp::{CaptureTimeSource, DateResolver, MediaTimestamp};

pub use cli::{Cli, run_cli};

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`. Call once from the
/// binary entry point; the library itself never installs a subscriber.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
