//! Slug set difference

use std::collections::HashSet;

use serde::Serialize;

/// Partition of slugs by which side holds them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDiff {
    /// Present locally only (push to create)
    pub local_only: Vec<String>,
    /// Present remotely only (pull to fetch)
    pub remote_only: Vec<String>,
    /// Present on both sides
    pub synced: Vec<String>,
}

fn dedup<I>(slugs: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    slugs
        .into_iter()
        .filter_map(|s| {
            let s = s.as_ref();
            seen.insert(s.to_string()).then(|| s.to_string())
        })
        .collect()
}

/// Partitions local and remote slugs
///
/// Duplicates are dropped; each group keeps the order its slugs were
/// first seen in (local order for `local_only` and `synced`).
pub fn compute_diff<L, R>(local: L, remote: R) -> SyncDiff
where
    L: IntoIterator,
    L::Item: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    let local = dedup(local);
    let remote = dedup(remote);

    let local_set: HashSet<&str> = local.iter().map(String::as_str).collect();
    let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();

    let (synced, local_only): (Vec<String>, Vec<String>) = local
        .iter()
        .cloned()
        .partition(|s| remote_set.contains(s.as_str()));

    let remote_only: Vec<String> = remote
        .iter()
        .filter(|s| !local_set.contains(s.as_str()))
        .cloned()
        .collect();

    SyncDiff {
        local_only,
        remote_only,
        synced,
    }
}
