//! Sync commands: status, push, pull

use anyhow::{Context, Result};
use crossterm::style::Color;

use super::output::Output;
use crate::domain::strip_extension;
use crate::remote::{self, RemoteStore};
use crate::storage::Workspace;
use crate::sync::{self, PullEvent, PushEvent, SyncError};

async fn open_store(output: &Output, workspace: &Workspace) -> Result<Box<dyn RemoteStore>> {
    let config = workspace.require_config()?;
    output.verbose_ctx(
        "db",
        &format!("Connecting (table {})", config.node_table()),
    );

    let store = remote::connect(&config)
        .await
        .context("Failed to connect to database")?;
    Ok(store)
}

/// Reports a missing target as an error line instead of failing the process
fn report_not_found<T>(output: &Output, result: Result<T, SyncError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            output.error(&e.to_string());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn status(output: &Output, workspace: &Workspace) -> Result<()> {
    let store = open_store(output, workspace).await?;
    let result = sync::status(store.as_ref(), &workspace.local_store()).await;
    store.close().await;
    let report = result?;

    if output.is_json() {
        output.data(&report);
        return Ok(());
    }

    output.title("Blog Status");

    for path in &report.unreadable {
        output.warn(&format!("Unreadable: {}", path.display()));
    }
    for row in &report.corrupt {
        output.warn(&format!("Unreadable in database: {} ({})", row.slug, row.reason));
    }

    let diff = &report.diff;

    if !diff.local_only.is_empty() {
        output.line(&output.paint("Local only (push to create):", Color::Green));
        for slug in &diff.local_only {
            output.line(&format!("  + {}", slug));
        }
        output.blank();
    }

    if !diff.remote_only.is_empty() {
        output.line(&output.paint("Database only (pull to fetch):", Color::Yellow));
        for slug in &diff.remote_only {
            match report.access_of(slug).filter(|level| !level.is_public()) {
                Some(level) => output.line(&format!("  - {} {}", slug, output.access_tag(level))),
                None => output.line(&format!("  - {}", slug)),
            }
        }
        output.blank();
    }

    if !diff.synced.is_empty() {
        output.line(&output.paint("Synced:", Color::Cyan));
        for slug in &diff.synced {
            output.line(&format!("  = {}", slug));
        }
        output.blank();
    }

    output.dim(&format!(
        "Total: {} local, {} in database",
        report.local_total, report.remote_total
    ));

    Ok(())
}

pub async fn push(
    output: &Output,
    workspace: &Workspace,
    slug: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let target = slug.map(strip_extension);
    let store = open_store(output, workspace).await?;

    output.title("Pushing Blogs");
    if dry_run {
        output.warn("DRY RUN - no changes will be made");
        output.blank();
    }

    let mut events = Vec::new();
    let result = sync::push(
        store.as_ref(),
        &workspace.local_store(),
        target,
        dry_run,
        |event| {
            match event {
                PushEvent::Created { slug } => output.ok(&format!("Created: {}", slug)),
                PushEvent::Updated { slug } => output.ok(&format!("Updated: {}", slug)),
                PushEvent::WouldCreate { slug } => output.info(&format!("Would create: {}", slug)),
                PushEvent::WouldUpdate { slug } => output.info(&format!("Would update: {}", slug)),
                PushEvent::Invalid { message, .. } => output.error(message),
                PushEvent::Failed { slug, message } => {
                    output.error(&format!("{}: {}", slug, message))
                }
            }
            events.push(event.clone());
        },
    )
    .await;
    store.close().await;

    let Some(report) = report_not_found(output, result)? else {
        return Ok(());
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "dryRun": dry_run,
            "created": report.created,
            "updated": report.updated,
            "errors": report.errors,
            "events": events,
        }));
        return Ok(());
    }

    if report.total() == 0 {
        output.warn("No blogs to push");
        return Ok(());
    }

    output.blank();
    if report.created > 0 {
        output.ok(&format!("Created: {}", report.created));
    }
    if report.updated > 0 {
        output.ok(&format!("Updated: {}", report.updated));
    }
    if report.errors > 0 {
        output.error(&format!("Errors: {}", report.errors));
    }

    Ok(())
}

pub async fn pull(
    output: &Output,
    workspace: &Workspace,
    slug: Option<&str>,
    force: bool,
) -> Result<()> {
    let target = slug.map(strip_extension);
    let store = open_store(output, workspace).await?;

    output.title("Pulling Blogs");

    let mut events = Vec::new();
    let result = sync::pull(
        store.as_ref(),
        &workspace.local_store(),
        target,
        force,
        |event| {
            match event {
                PullEvent::Created { slug, .. } => output.ok(&format!("Created: {}.md", slug)),
                PullEvent::Updated { slug, .. } => output.ok(&format!("Updated: {}.md", slug)),
                PullEvent::Skipped { slug } => output.warn(&format!(
                    "Skipped (exists): {} - use --force to overwrite",
                    slug
                )),
                PullEvent::Invalid { slug } => {
                    output.warn(&format!("Skipped (invalid slug): {}", slug))
                }
                PullEvent::Corrupt { slug, message } => {
                    output.error(&format!("{}: {}", slug, message))
                }
            }
            events.push(event.clone());
        },
    )
    .await;
    store.close().await;

    let Some(report) = report_not_found(output, result)? else {
        return Ok(());
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "fetched": report.fetched,
            "created": report.created,
            "updated": report.updated,
            "skipped": report.skipped,
            "errors": report.errors,
            "events": events,
        }));
        return Ok(());
    }

    if report.fetched == 0 {
        output.warn("No blogs in database");
        return Ok(());
    }

    output.blank();
    if report.created > 0 {
        output.ok(&format!("Created: {}", report.created));
    }
    if report.updated > 0 {
        output.ok(&format!("Updated: {}", report.updated));
    }
    if report.skipped > 0 {
        output.warn(&format!("Skipped: {}", report.skipped));
    }
    if report.errors > 0 {
        output.error(&format!("Errors: {}", report.errors));
    }

    Ok(())
}
