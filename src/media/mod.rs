//! # Image Uploads
//!
//! Uploads images to Cloudinary and builds the URLs and markdown snippets
//! pasted into posts.
//!
//! Credentials come from a `cloudinary://<api_key>:<api_secret>@<cloud_name>`
//! URL stored in the config file.

mod cloudinary;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use cloudinary::{sign, CloudinaryClient, Credentials, UploadOptions, UploadedImage};

/// Extensions accepted by `blog img` (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "svg", "avif"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Not an image file: {0}")]
    NotAnImage(String),

    #[error("Invalid Cloudinary URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Checks that `path` is an existing file with an image extension
pub fn check_image(path: &Path) -> Result<(), MediaError> {
    if !path.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else if ext.is_empty() {
        Err(MediaError::NotAnImage("(no extension)".to_string()))
    } else {
        Err(MediaError::NotAnImage(format!(".{}", ext)))
    }
}

/// Inserts a width transformation (plus automatic quality) into a delivery URL
pub fn with_width(url: &str, width: u32) -> String {
    url.replacen("/upload/", &format!("/upload/w_{},q_auto/", width), 1)
}

/// Markdown image snippet
pub fn markdown_image(alt: &str, url: &str) -> String {
    format!("![{}]({})", alt, url)
}
