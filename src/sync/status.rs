//! Status: slug presence on both sides

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::{compute_diff, SyncDiff, SyncError};
use crate::domain::AccessLevel;
use crate::remote::{RemoteStore, StoreError};
use crate::storage::LocalStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub diff: SyncDiff,

    /// Distinct local slugs
    pub local_total: usize,

    /// Distinct remote slugs
    pub remote_total: usize,

    /// Access level of every remote document
    pub remote_access: BTreeMap<String, AccessLevel>,

    /// Local files that could not be parsed (counted by file name)
    pub unreadable: Vec<PathBuf>,

    /// Remote rows that could not be decoded (counted by slug)
    pub corrupt: Vec<RemoteFailure>,
}

/// A remote row that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFailure {
    pub slug: String,
    pub reason: String,
}

impl StatusReport {
    /// Access level of a remote slug
    pub fn access_of(&self, slug: &str) -> Option<AccessLevel> {
        self.remote_access.get(slug).copied()
    }
}

/// Compares local files with remote rows by slug
pub async fn status(store: &dyn RemoteStore, local: &LocalStore) -> Result<StatusReport, SyncError> {
    let scan = local.scan()?;
    let mut remote = Vec::new();
    let mut corrupt = Vec::new();
    for listed in store.find_all(None).await? {
        match listed {
            Ok(document) => remote.push(document),
            Err(StoreError::CorruptRow { slug, reason }) => {
                corrupt.push(RemoteFailure { slug, reason })
            }
            Err(e) => return Err(e.into()),
        }
    }

    let local_slugs: Vec<String> = scan
        .documents
        .iter()
        .map(|d| d.document.slug.clone())
        .chain(scan.failures.iter().map(|f| f.stem().to_string()))
        .collect();
    let remote_slugs: Vec<&str> = remote
        .iter()
        .map(|d| d.slug.as_str())
        .chain(corrupt.iter().map(|c| c.slug.as_str()))
        .collect();

    let diff = compute_diff(&local_slugs, &remote_slugs);

    let remote_access: BTreeMap<String, AccessLevel> = remote
        .iter()
        .map(|d| (d.slug.clone(), d.access_level))
        .collect();

    Ok(StatusReport {
        local_total: diff.local_only.len() + diff.synced.len(),
        remote_total: diff.remote_only.len() + diff.synced.len(),
        diff,
        remote_access,
        unreadable: scan.failures.into_iter().map(|f| f.path).collect(),
        corrupt,
    })
}
