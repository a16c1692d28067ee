//! Local post commands: new, edit, rm, list, open

use anyhow::Result;
use chrono::Local;
use crossterm::style::Color;
use serde::Serialize;

use super::output::Output;
use super::shell;
use crate::domain::{slugify, strip_extension, title_from_slug, AccessLevel, DocumentStatus};
use crate::remote::{self, RemoteStore, StoreError};
use crate::storage::{is_safe_stem, render_template, Workspace};

pub fn new_post(output: &Output, workspace: &Workspace, arg: &str) -> Result<()> {
    let slug = slugify(arg);
    if slug.is_empty() {
        output.error(&format!("Invalid slug: {}", arg));
        return Ok(());
    }

    let store = workspace.local_store();
    if store.exists(&slug) {
        output.error(&format!("File already exists: {}.md", slug));
        return Ok(());
    }

    let title = title_from_slug(arg.trim());
    let today = Local::now().date_naive();
    output.verbose_ctx("new", &format!("slug={}, title={}", slug, title));

    let path = store.write_raw(&slug, &render_template(&title, &slug, today))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "slug": slug,
            "title": title,
            "path": path,
        }));
        return Ok(());
    }

    output.ok(&format!("Created: {}", path.display()));

    if let Some(editor) = shell::env_editor() {
        output.dim(&format!("Opening in {}...", editor));
        shell::open_in_editor(&editor, &path)?;
    }

    Ok(())
}

pub fn edit(output: &Output, workspace: &Workspace, arg: &str) -> Result<()> {
    let slug = strip_extension(arg);
    let store = workspace.local_store();

    if !is_safe_stem(slug) || !store.exists(slug) {
        output.error(&format!("Blog not found: {}", slug));
        output.dim("Run 'blog list' to see available blogs");
        return Ok(());
    }

    let editor = shell::env_editor().unwrap_or_else(|| shell::FALLBACK_EDITOR.to_string());
    output.verbose_ctx("edit", &format!("Opening {} with {}", slug, editor));
    shell::open_in_editor(&editor, &store.path_for(slug))
}

/// Deletes `slug` remotely; returns whether a row existed
async fn delete_remote(store: &dyn RemoteStore, slug: &str) -> Result<bool, StoreError> {
    if store.find_by_slug(slug).await?.is_none() {
        return Ok(false);
    }
    store.delete(slug).await?;
    Ok(true)
}

pub async fn remove(output: &Output, workspace: &Workspace, arg: &str) -> Result<()> {
    let slug = strip_extension(arg);
    if !is_safe_stem(slug) {
        output.error(&format!("Blog not found: {}", slug));
        return Ok(());
    }

    let local_removed = workspace.local_store().remove(slug)?;
    if local_removed {
        output.ok(&format!("Deleted local: {}.md", slug));
    }

    let config = workspace.require_config()?;

    let remote_result = match remote::connect(&config).await {
        Ok(store) => {
            let result = delete_remote(store.as_ref(), slug).await;
            store.close().await;
            result
        }
        Err(e) => Err(e),
    };

    let remote_removed = match remote_result {
        Ok(removed) => {
            if removed {
                output.ok(&format!("Deleted from DB: {}", slug));
            } else {
                output.verbose_ctx("rm", &format!("{} not in database", slug));
            }
            removed
        }
        Err(e) => {
            output.error(&format!("DB: {}", e));
            false
        }
    };

    output.data(&serde_json::json!({
        "slug": slug,
        "local": local_removed,
        "remote": remote_removed,
    }));

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    slug: String,
    title: String,
    status: DocumentStatus,
    access_level: AccessLevel,
    file: String,
}

pub fn list(output: &Output, workspace: &Workspace) -> Result<()> {
    let scan = workspace.local_store().scan()?;

    for failure in &scan.failures {
        output.warn(&format!("Unreadable: {}.md ({:#})", failure.stem(), failure.error));
    }

    let mut items: Vec<ListItem> = scan
        .documents
        .iter()
        .map(|d| ListItem {
            slug: d.document.slug.clone(),
            title: d.document.title.clone(),
            status: d.document.status,
            access_level: d.document.access_level,
            file: d.stem().to_string(),
        })
        .collect();
    items.sort_by_key(|item| item.access_level);

    if output.is_json() {
        output.data(&items);
        return Ok(());
    }

    if items.is_empty() {
        output.warn("No blogs found");
        output.dim("Create one with: blog new my-first-post");
        return Ok(());
    }

    output.title("Local Blogs");

    for item in &items {
        output.line(&format!(
            "{} {} {}",
            item.status.icon(),
            output.paint(&item.slug, Color::Cyan),
            output.access_tag(item.access_level)
        ));
        output.dim(&format!("    {}", item.title));
    }

    output.blank();
    output.dim(&format!("Total: {} blogs", items.len()));

    Ok(())
}

pub fn open(output: &Output, workspace: &Workspace) -> Result<()> {
    let store = workspace.local_store();
    store.ensure_dir()?;

    shell::open_folder(store.dir())?;
    output.ok(&format!("Opened: {}", store.dir().display()));

    Ok(())
}
