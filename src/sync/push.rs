//! Push: local → remote

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SyncError;
use crate::domain::{Document, ValidationError};
use crate::remote::RemoteStore;
use crate::storage::{LocalDocument, LocalStore, ScanFailure};

/// What happened to one document during a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PushEvent {
    Created { slug: String },
    Updated { slug: String },
    WouldCreate { slug: String },
    WouldUpdate { slug: String },
    /// Rejected before reaching the remote store
    Invalid { file: String, message: String },
    /// Rejected by the remote store
    Failed { slug: String, message: String },
}

/// Counters of a push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

impl PushReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.errors
    }
}

/// Picks `publishedAt` for the remote row
///
/// The document's own date wins. Without one, a published document gets
/// `now` if the remote row has no date yet; otherwise the remote value is
/// kept (or left empty for a new row).
pub fn resolve_published_at(
    document: &Document,
    existing: Option<&Document>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(at) = document.published_at {
        return Some(at);
    }

    let existing_at = existing.and_then(|e| e.published_at);
    if document.is_published() && existing_at.is_none() {
        Some(now)
    } else {
        existing_at
    }
}

fn file_name(local: &LocalDocument) -> String {
    local
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| local.document.slug.clone())
}

fn invalid_message(error: &ValidationError, file: &str) -> String {
    match error {
        ValidationError::InvalidSlug(_) => error.to_string(),
        _ => format!("{}: {}", error, file),
    }
}

/// Restricts a scan to the documents matching `target` by slug or file stem
fn select(
    documents: Vec<LocalDocument>,
    failures: Vec<ScanFailure>,
    target: Option<&str>,
) -> Result<(Vec<LocalDocument>, Vec<ScanFailure>), SyncError> {
    let Some(target) = target else {
        return Ok((documents, failures));
    };

    let documents: Vec<_> = documents
        .into_iter()
        .filter(|d| d.document.slug == target || d.stem() == target)
        .collect();
    let failures: Vec<_> = failures
        .into_iter()
        .filter(|f| f.stem() == target)
        .collect();

    if documents.is_empty() && failures.is_empty() {
        return Err(SyncError::NotFoundLocally(target.to_string()));
    }

    Ok((documents, failures))
}

/// Pushes local documents to the remote store
///
/// Every selected document is created or updated by slug. With `dry_run`
/// the classification is reported but the store is never written.
/// `on_event` sees each document as it is handled.
pub async fn push(
    store: &dyn RemoteStore,
    local: &LocalStore,
    target: Option<&str>,
    dry_run: bool,
    mut on_event: impl FnMut(&PushEvent),
) -> Result<PushReport, SyncError> {
    let scan = local.scan()?;
    let (documents, failures) = select(scan.documents, scan.failures, target)?;

    let mut report = PushReport::default();
    let mut emit = |report: &mut PushReport, event: PushEvent| {
        match &event {
            PushEvent::Created { .. } | PushEvent::WouldCreate { .. } => report.created += 1,
            PushEvent::Updated { .. } | PushEvent::WouldUpdate { .. } => report.updated += 1,
            PushEvent::Invalid { .. } | PushEvent::Failed { .. } => report.errors += 1,
        }
        on_event(&event);
    };

    for failure in failures {
        let file = failure
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let message = format!("{:#}", failure.error);
        emit(&mut report, PushEvent::Invalid { file, message });
    }

    let now = Utc::now();

    for local_doc in documents {
        let document = &local_doc.document;

        if let Err(error) = document.validate() {
            let file = file_name(&local_doc);
            let message = invalid_message(&error, &file);
            emit(&mut report, PushEvent::Invalid { file, message });
            continue;
        }

        let slug = document.slug.clone();

        let existing = match store.find_by_slug(&slug).await {
            Ok(existing) => existing,
            Err(e) if e.is_document_error() => {
                let message = e.to_string();
                emit(&mut report, PushEvent::Failed { slug, message });
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut payload = document.clone();
        payload.published_at = resolve_published_at(document, existing.as_ref(), now);

        if dry_run {
            let event = if existing.is_some() {
                PushEvent::WouldUpdate { slug }
            } else {
                PushEvent::WouldCreate { slug }
            };
            emit(&mut report, event);
            continue;
        }

        let result = match existing {
            Some(_) => store
                .update(&slug, &payload)
                .await
                .map(|_| PushEvent::Updated { slug: slug.clone() }),
            None => store
                .create(&payload)
                .await
                .map(|_| PushEvent::Created { slug: slug.clone() }),
        };

        match result {
            Ok(event) => emit(&mut report, event),
            Err(e) if e.is_document_error() => {
                let message = e.to_string();
                emit(&mut report, PushEvent::Failed { slug, message });
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}
