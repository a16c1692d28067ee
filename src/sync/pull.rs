//! Pull: remote → local

use std::path::PathBuf;

use serde::Serialize;

use super::SyncError;
use crate::domain::is_valid_slug;
use crate::remote::{RemoteStore, StoreError};
use crate::storage::LocalStore;

/// What happened to one remote document during a pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PullEvent {
    Created { slug: String, path: PathBuf },
    Updated { slug: String, path: PathBuf },
    /// Local file exists and `force` was not given
    Skipped { slug: String },
    /// Slug cannot name a local file
    Invalid { slug: String },
    /// Row could not be decoded
    Corrupt { slug: String, message: String },
}

/// Counters of a pull
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    /// Remote documents considered
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Rows that could not be decoded
    pub errors: usize,
}

/// Writes remote documents into the local store
///
/// Existing files are left alone unless `force` is set. A `target` with no
/// remote match is an error; an empty remote table is not.
pub async fn pull(
    store: &dyn RemoteStore,
    local: &LocalStore,
    target: Option<&str>,
    force: bool,
    mut on_event: impl FnMut(&PullEvent),
) -> Result<PullReport, SyncError> {
    let documents = store.find_all(target).await?;

    if documents.is_empty() {
        return match target {
            Some(slug) => Err(SyncError::NotFoundRemotely(slug.to_string())),
            None => Ok(PullReport::default()),
        };
    }

    let mut report = PullReport {
        fetched: documents.len(),
        ..PullReport::default()
    };

    for listed in documents {
        let document = match listed {
            Ok(document) => document,
            Err(StoreError::CorruptRow { slug, reason }) => {
                report.errors += 1;
                on_event(&PullEvent::Corrupt {
                    slug,
                    message: reason,
                });
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let slug = document.slug.clone();

        // Slugs become file names
        if !is_valid_slug(&slug) {
            report.skipped += 1;
            on_event(&PullEvent::Invalid { slug });
            continue;
        }

        let existed = local.exists(&slug);
        if existed && !force {
            report.skipped += 1;
            on_event(&PullEvent::Skipped { slug });
            continue;
        }

        let path = local.write(&document)?;

        let event = if existed {
            report.updated += 1;
            PullEvent::Updated { slug, path }
        } else {
            report.created += 1;
            PullEvent::Created { slug, path }
        };
        on_event(&event);
    }

    Ok(report)
}
