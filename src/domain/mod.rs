//! Domain models for the blog CLI
//!
//! Contains the document model and slug rules without any I/O concerns.

mod document;
mod slug;

pub use document::{AccessLevel, Document, DocumentStatus, Metadata};
pub(crate) use document::{value_to_string, value_to_tags};
pub use slug::{is_valid_slug, slugify, strip_extension, title_from_slug, ValidationError};
