//! Document domain model
//!
//! A document is one blog post. Locally it is a markdown file with
//! frontmatter, remotely it is a row of the node table. Both sides are
//! matched by slug alone.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::slug::{is_valid_slug, ValidationError};

/// Publication status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Published => "published",
            DocumentStatus::Archived => "archived",
        }
    }

    /// Checkbox-style marker used by `blog list`
    pub fn icon(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "[ ]",
            DocumentStatus::Published => "[x]",
            DocumentStatus::Archived => "[-]",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "published" => Ok(DocumentStatus::Published),
            "archived" => Ok(DocumentStatus::Archived),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Who can read a document once published
///
/// Variants are declared from most to least open, so the derived `Ord`
/// sorts public before reader before admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Public,
    Reader,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Reader => "reader",
            AccessLevel::Admin => "admin",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, AccessLevel::Public)
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessLevel::Public),
            "reader" => Ok(AccessLevel::Reader),
            "admin" => Ok(AccessLevel::Admin),
            _ => Err(format!("Unknown access level: {}", s)),
        }
    }
}

/// Document metadata
///
/// Three keys are well known; everything else lives in an ordered list of
/// extra entries so the frontmatter keeps its key order across a round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub description: String,
    pub image: String,
    pub tags: Vec<String>,
    extra: Vec<(String, Value)>,
}

impl Metadata {
    /// Frontmatter keys owned by [`Document`] fields, never kept as extras
    pub const DOCUMENT_KEYS: [&'static str; 5] =
        ["title", "slug", "status", "accessLevel", "publishedAt"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an extra value, keeping the position of an existing key
    ///
    /// Well-known keys are routed to their fields. Keys in
    /// [`Self::DOCUMENT_KEYS`] are dropped.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        match key.as_str() {
            "description" => self.description = value_to_string(&value),
            "image" => self.image = value_to_string(&value),
            "tags" => self.tags = value_to_tags(&value),
            k if Self::DOCUMENT_KEYS.contains(&k) => {}
            _ => {
                if let Some(slot) = self.extra.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    self.extra.push((key, value));
                }
            }
        }
    }

    /// Iterates extra entries in insertion order
    pub fn extra(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds metadata from the JSON blob stored remotely
    pub fn from_json(value: &Value) -> Self {
        let mut meta = Metadata::new();

        if let Value::Object(map) = value {
            for (key, value) in map {
                meta.set(key.clone(), value.clone());
            }
        }

        meta
    }

    /// Converts to the JSON blob stored remotely
    pub fn to_json(&self) -> Value {
        // Serialization of a map with string keys cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.extra.len()))?;
        map.serialize_entry("description", &self.description)?;
        map.serialize_entry("image", &self.image)?;
        map.serialize_entry("tags", &self.tags)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Renders a scalar as a plain string; `null` and containers become empty
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Tags are a list of strings; anything that is not a list yields no tags
pub(crate) fn value_to_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier shared by the local file and the remote row
    pub slug: String,

    pub title: String,

    /// Markdown body (excluding frontmatter)
    #[serde(rename = "content")]
    pub body: String,

    pub status: DocumentStatus,

    pub access_level: AccessLevel,

    pub published_at: Option<DateTime<Utc>>,

    pub metadata: Metadata,
}

impl Document {
    /// Creates a draft, public document with an empty body
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            body: String::new(),
            status: DocumentStatus::default(),
            access_level: AccessLevel::default(),
            published_at: None,
            metadata: Metadata::new(),
        }
    }

    /// Checks the document may be written to the remote store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.slug.is_empty() {
            return Err(ValidationError::MissingSlug);
        }
        if !is_valid_slug(&self.slug) {
            return Err(ValidationError::InvalidSlug(self.slug.clone()));
        }
        Ok(())
    }

    pub fn is_published(&self) -> bool {
        self.status == DocumentStatus::Published
    }
}
