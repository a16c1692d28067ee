//! Blog CLI - manage markdown blog posts and sync them with a database
//!
//! Posts live as markdown files with YAML frontmatter in `~/blogs`. The
//! CLI compares them with the rows of the blog's node table by slug and
//! pushes or pulls them one direction at a time. It can also upload images
//! to Cloudinary.

pub mod cli;
pub mod domain;
pub mod media;
pub mod remote;
pub mod storage;
pub mod sync;

pub use domain::{AccessLevel, Document, DocumentStatus, Metadata};
pub use remote::{RemoteStore, StoreError};
pub use sync::{compute_diff, SyncDiff, SyncError};
