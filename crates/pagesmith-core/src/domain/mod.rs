//! Domain models for pagesmith.
//!
//! Canonical definitions for the entities that flow through one build:
//! - `BuildRequest`: inbound brief, round and callback details
//! - `GeneratedFileSet`: the site files produced by the generator
//! - `RepositoryHandle` / `CommitSha`: where the site was pushed
//! - `NotificationPayload`: what the evaluator receives

pub mod error;
pub mod files;
pub mod payload;
pub mod repo;
pub mod request;

pub use error::{BuildError, Result};
pub use files::{GeneratedFileSet, INDEX_HTML, LICENSE, README_MD, REQUIRED_FILES};
pub use payload::NotificationPayload;
pub use repo::{
    CommitSha, CreatedRepository, PublishResult, PushedRepository, RepositoryHandle,
    DEFAULT_BRANCH,
};
pub use request::{authenticate_secret, BuildRequest, BuildTarget, ValidatedRequest, DEFAULT_NONCE};
