//! # Storage Layer
//!
//! Local persistence for the blog CLI.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Documents | Markdown + YAML frontmatter | `~/blogs/{slug}.md` |
//! | Config | JSON | `~/.config/blog/config.json` |
//!
//! Both locations can be overridden (`--dir` / `BLOG_DIR`,
//! `--config` / `BLOG_CONFIG`).
//!
//! ## Key Types
//!
//! - [`Workspace`] - Resolves paths for one invocation
//! - [`LocalStore`] - Lists, reads and writes document files
//! - [`Config`] - User configuration
//! - [`parse_document`] / [`render_document`] - The markdown codec

mod config;
mod local;
mod markdown;
mod workspace;

pub use config::{mask_secret, Config, ConfigError, DEFAULT_MEDIA_FOLDER, DEFAULT_NODE_TABLE};
pub use local::{
    is_document_name, is_safe_stem, LocalDocument, LocalStore, Scan, ScanFailure, DOCUMENT_EXTENSION,
};
pub use markdown::{
    parse_document, parse_published_at, render_document, render_template, CodecError,
};
pub use workspace::Workspace;
