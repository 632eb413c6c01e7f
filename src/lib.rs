//! Launchpad merge proposal data with inline review comments mapped onto
//! files and post-change line numbers.

pub mod cache;
pub mod comments;
pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod launchpad;
pub mod loader;
pub mod review;
pub mod types;

// Explicit re-exports of the diff mapping API
pub use comments::{consolidate, resolve_comments, RawInlineComment, ResolvedComment, ServiceLineBase};
pub use diff::{aggregate_file_stats, resolve, resolve_many, scan, FileDiffStat, FileStatus, LinePosition};
pub use error::DiffError;
