//! Image upload command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::style::Color;

use super::output::Output;
use super::shell;
use crate::media::{
    check_image, markdown_image, with_width, CloudinaryClient, Credentials, UploadOptions,
};
use crate::storage::Workspace;

/// Arguments of `blog img`
#[derive(Debug, Clone)]
pub struct ImgArgs {
    pub file: PathBuf,
    pub width: Option<u32>,
    pub name: Option<String>,
    pub alt: Option<String>,
}

fn resolve(file: &Path) -> Result<PathBuf> {
    if file.is_absolute() {
        return Ok(file.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(file))
}

pub async fn upload(output: &Output, workspace: &Workspace, args: ImgArgs) -> Result<()> {
    let config = workspace.config()?.unwrap_or_default();

    let cloudinary_url = match config.cloudinary_url() {
        Ok(url) => url,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(());
        }
    };

    let path = resolve(&args.file)?;
    if let Err(e) = check_image(&path) {
        output.error(&e.to_string());
        return Ok(());
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.info(&format!("Uploading: {}...", file_name));

    let options = UploadOptions {
        folder: config.cloudinary_folder().to_string(),
        public_id: args.name.clone(),
    };
    output.verbose_ctx(
        "img",
        &format!("folder={}, public_id={:?}", options.folder, options.public_id),
    );

    let uploaded = match Credentials::parse(cloudinary_url) {
        Ok(credentials) => CloudinaryClient::new(credentials).upload(&path, &options).await,
        Err(e) => Err(e),
    };
    let image = match uploaded {
        Ok(image) => image,
        Err(e) => {
            output.error(&format!("Upload failed: {}", e));
            return Ok(());
        }
    };

    let url = match args.width {
        Some(width) => with_width(&image.url, width),
        None => image.url.clone(),
    };

    let alt = args.alt.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let markdown = markdown_image(&alt, &url);

    if output.is_json() {
        output.data(&serde_json::json!({
            "url": url,
            "publicId": image.public_id,
            "markdown": markdown,
        }));
        return Ok(());
    }

    match shell::copy_to_clipboard(&url) {
        Ok(()) => output.ok("Copied to clipboard!"),
        Err(e) => output.verbose_ctx("img", &format!("Clipboard unavailable: {:#}", e)),
    }

    output.blank();
    output.line(&output.paint(&url, Color::Cyan));
    output.blank();
    output.dim(&format!("Markdown: {}", markdown));

    Ok(())
}
