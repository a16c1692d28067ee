//! # Reconciliation
//!
//! Compares the local blog directory with the remote node table and moves
//! documents in one direction at a time.
//!
//! Identity is the slug alone. Nothing is compared beyond slug presence:
//! "synced" means the slug exists on both sides, not that the content
//! matches.
//!
//! | Operation | Direction | Overwrites |
//! |-----------|-----------|------------|
//! | [`push`] | local → remote | always (create or update) |
//! | [`pull`] | remote → local | only with `force` |
//! | [`status`] | none | never |
//!
//! Per-document problems (invalid slug, unreadable file or row, existing
//! file) become counters on the report. Connection-level failures abort the
//! operation with [`SyncError::Store`].

mod diff;
mod pull;
mod push;
mod status;

use thiserror::Error;

use crate::remote::StoreError;

pub use diff::{compute_diff, SyncDiff};
pub use pull::{pull, PullEvent, PullReport};
pub use push::{push, resolve_published_at, PushEvent, PushReport};
pub use status::{status, RemoteFailure, StatusReport};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Blog not found: {0}")]
    NotFoundLocally(String),

    #[error("Blog not found in database: {0}")]
    NotFoundRemotely(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Local(#[from] anyhow::Error),
}

impl SyncError {
    /// Returns true if a named target did not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::NotFoundLocally(_) | SyncError::NotFoundRemotely(_)
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tempfile::TempDir;

    use crate::domain::Document;
    use crate::remote::{RemoteStore, SqliteStore};
    use crate::storage::LocalStore;

    pub struct Fixture {
        _dir: TempDir,
        pub local: LocalStore,
        pub remote: SqliteStore,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let local = LocalStore::new(dir.path().join("blogs"));
            local.ensure_dir().unwrap();
            Self {
                _dir: dir,
                local,
                remote: SqliteStore::open_in_memory().unwrap(),
            }
        }

        pub fn write_local(&self, slug: &str, title: &str) -> Document {
            let doc = Document::new(slug, title);
            self.local.write(&doc).unwrap();
            doc
        }

        pub async fn insert_remote(&self, slug: &str, title: &str) -> Document {
            self.remote.create(&Document::new(slug, title)).await.unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages() {
        assert_eq!(
            SyncError::NotFoundLocally("x".into()).to_string(),
            "Blog not found: x"
        );
        assert_eq!(
            SyncError::NotFoundRemotely("x".into()).to_string(),
            "Blog not found in database: x"
        );
        assert!(SyncError::NotFoundRemotely("x".into()).is_not_found());
        assert!(!SyncError::Store(StoreError::Connection("down".into())).is_not_found());
    }
}
