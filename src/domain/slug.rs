//! Slug rules
//!
//! A slug is the identity of a document on both sides of a sync: it names
//! the local file (`{slug}.md`) and is the unique key of the remote row.
//! Only lowercase ASCII letters, digits and `-` are allowed.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing title")]
    MissingTitle,

    #[error("Missing slug")]
    MissingSlug,

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),
}

/// Returns true if `slug` matches `^[a-z0-9-]+$`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Normalizes free text into a slug
///
/// Lowercases, drops anything that is not `[a-z0-9]`, whitespace or `-`,
/// turns whitespace runs into `-` and collapses repeated dashes.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut in_space = false;

    for c in lowered.chars() {
        if c.is_whitespace() {
            in_space = true;
            continue;
        }

        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            continue;
        }

        if in_space {
            slug.push('-');
            in_space = false;
        }
        slug.push(c);
    }

    let mut collapsed = String::with_capacity(slug.len());
    for c in slug.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed
}

/// Builds a display title from a slug-ish argument (`my-first-post` -> `My First Post`)
pub fn title_from_slug(text: &str) -> String {
    let spaced = text.replace('-', " ");

    let mut title = String::with_capacity(spaced.len());
    let mut word_start = true;

    for c in spaced.chars() {
        if word_start && c.is_alphanumeric() {
            title.extend(c.to_uppercase());
        } else {
            title.push(c);
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }

    title
}

/// Strips a trailing `.md` from a user-supplied slug argument
pub fn strip_extension(arg: &str) -> &str {
    arg.strip_suffix(".md").unwrap_or(arg)
}
