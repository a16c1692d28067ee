//! Markdown codec for documents
//!
//! A document file starts with a `---` delimited YAML frontmatter block,
//! followed by the markdown body:
//!
//! ```text
//! ---
//! title: "Hello World"
//! slug: "hello-world"
//! status: "published"
//! accessLevel: "public"
//! publishedAt: "2024-03-01"
//! tags:
//!   - "rust"
//! series: "intro"
//! ---
//!
//! # Hello World
//! ```
//!
//! Keys other than the known ones are kept, in order, in the document's
//! extra metadata. Rendering writes them back after the known keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use thiserror::Error;

use crate::domain::{value_to_string, value_to_tags, Document, Metadata};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Missing frontmatter end delimiter (---)")]
    UnterminatedFrontmatter,

    #[error("Failed to parse frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Frontmatter must be a mapping of keys to values")]
    NotAMapping,

    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

const DELIMITER: &str = "---";

/// Splits frontmatter from body
///
/// Returns `None` for the frontmatter when the text does not open with a
/// delimiter line.
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), CodecError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return Ok((None, content));
    };

    let rest = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        Some(rest) => rest,
        None if rest.trim().is_empty() => return Err(CodecError::UnterminatedFrontmatter),
        // `----` or `--- text` is body, not a delimiter
        None => return Ok((None, content)),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(CodecError::UnterminatedFrontmatter)
}

/// Converts a YAML value into the JSON model used for metadata
fn yaml_to_json(value: &YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        YamlValue::String(s) => Value::String(s.clone()),
        YamlValue::Sequence(items) => Value::Array(items.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Mapping keys are usually strings, but `2024: x` is valid YAML too
fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        other => value_to_string(&yaml_to_json(other)),
    }
}

/// Reads a scalar that must be a string (or absent) and parses it
fn parse_enum<T: std::str::FromStr + Default>(
    field: &'static str,
    value: Option<&Value>,
) -> Result<T, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(s)) => s.parse().map_err(|_| CodecError::InvalidField {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(CodecError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_published_at(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn parse_published_field(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            parse_published_at(s)
                .map(Some)
                .ok_or_else(|| CodecError::InvalidField {
                    field: "publishedAt",
                    value: s.clone(),
                })
        }
        Some(other) => Err(CodecError::InvalidField {
            field: "publishedAt",
            value: other.to_string(),
        }),
    }
}

/// Parses a markdown document
///
/// `fallback_slug` (normally the file name without extension) is used when
/// the frontmatter carries no slug.
pub fn parse_document(content: &str, fallback_slug: &str) -> Result<Document, CodecError> {
    let (frontmatter, body) = split_frontmatter(content)?;

    let mapping = match frontmatter {
        Some(yaml) if !yaml.trim().is_empty() => match serde_yaml::from_str::<YamlValue>(yaml)? {
            YamlValue::Mapping(map) => map,
            YamlValue::Null => serde_yaml::Mapping::new(),
            _ => return Err(CodecError::NotAMapping),
        },
        _ => serde_yaml::Mapping::new(),
    };

    let mut fields: Vec<(String, Value)> = mapping
        .iter()
        .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
        .collect();

    let mut take = |key: &str| -> Option<Value> {
        let pos = fields.iter().position(|(k, _)| k == key)?;
        Some(fields.remove(pos).1)
    };

    let title = take("title").map(|v| value_to_string(&v)).unwrap_or_default();
    let slug = take("slug")
        .map(|v| value_to_string(&v))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_slug.to_string());
    let status = parse_enum("status", take("status").as_ref())?;
    let access_level = parse_enum("accessLevel", take("accessLevel").as_ref())?;
    let published_at = parse_published_field(take("publishedAt").as_ref())?;

    let mut metadata = Metadata::new();
    metadata.description = take("description")
        .map(|v| value_to_string(&v))
        .unwrap_or_default();
    metadata.image = take("image").map(|v| value_to_string(&v)).unwrap_or_default();
    metadata.tags = take("tags").map(|v| value_to_tags(&v)).unwrap_or_default();

    for (key, value) in fields {
        metadata.set(key, value);
    }

    Ok(Document {
        slug,
        title,
        body: body.trim().to_string(),
        status,
        access_level,
        published_at,
        metadata,
    })
}

/// Quotes a string as a YAML double-quoted scalar
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Words YAML reads as null or booleans when left unquoted
const YAML_KEYWORDS: [&str; 9] = [
    "null", "Null", "NULL", "true", "True", "TRUE", "false", "False", "FALSE",
];

/// Keys are written bare when they are plain identifiers
fn render_key(key: &str) -> String {
    let plain = !YAML_KEYWORDS.contains(&key)
        && key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

fn render_inline(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(render_inline).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), render_inline(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn render_entry(lines: &mut Vec<String>, key: &str, value: &Value) {
    let key = render_key(key);
    match value {
        Value::Array(items) if items.is_empty() => lines.push(format!("{}: []", key)),
        Value::Array(items) => {
            lines.push(format!("{}:", key));
            for item in items {
                lines.push(format!("  - {}", render_inline(item)));
            }
        }
        other => lines.push(format!("{}: {}", key, render_inline(other))),
    }
}

/// Renders a document to markdown with frontmatter
pub fn render_document(doc: &Document) -> String {
    let mut lines = Vec::new();

    render_entry(&mut lines, "title", &Value::from(doc.title.as_str()));
    render_entry(&mut lines, "slug", &Value::from(doc.slug.as_str()));
    render_entry(&mut lines, "status", &Value::from(doc.status.as_str()));
    render_entry(&mut lines, "accessLevel", &Value::from(doc.access_level.as_str()));

    if let Some(published_at) = doc.published_at {
        let date = published_at.format("%Y-%m-%d").to_string();
        render_entry(&mut lines, "publishedAt", &Value::from(date));
    }

    let meta = &doc.metadata;
    if !meta.description.is_empty() {
        render_entry(&mut lines, "description", &Value::from(meta.description.as_str()));
    }
    if !meta.image.is_empty() {
        render_entry(&mut lines, "image", &Value::from(meta.image.as_str()));
    }
    if !meta.tags.is_empty() {
        render_entry(&mut lines, "tags", &Value::from(meta.tags.clone()));
    }

    for (key, value) in meta.extra() {
        render_entry(&mut lines, key, value);
    }

    let mut content = String::new();
    content.push_str(DELIMITER);
    content.push('\n');
    content.push_str(&lines.join("\n"));
    content.push('\n');
    content.push_str(DELIMITER);
    content.push_str("\n\n");
    content.push_str(&doc.body);

    if !content.ends_with('\n') {
        content.push('\n');
    }

    content
}

/// Renders the starter file written by `blog new`
///
/// Unlike [`render_document`] it lists every known key, empty ones
/// included, so they are ready to fill in.
pub fn render_template(title: &str, slug: &str, published: NaiveDate) -> String {
    let mut lines = Vec::new();

    render_entry(&mut lines, "title", &Value::from(title));
    render_entry(&mut lines, "slug", &Value::from(slug));
    render_entry(&mut lines, "status", &Value::from("draft"));
    render_entry(&mut lines, "accessLevel", &Value::from("public"));
    render_entry(
        &mut lines,
        "publishedAt",
        &Value::from(published.format("%Y-%m-%d").to_string()),
    );
    render_entry(&mut lines, "description", &Value::from(""));
    render_entry(&mut lines, "image", &Value::from(""));
    render_entry(&mut lines, "tags", &Value::Array(Vec::new()));

    format!(
        "{delim}\n{}\n{delim}\n\n# {}\n\nStart writing here...\n",
        lines.join("\n"),
        title,
        delim = DELIMITER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccessLevel, DocumentStatus};
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Document {
        let mut doc = Document::new("hello-world", "Hello: World");
        doc.body = "# Hello\n\nSome \"quoted\" text.".to_string();
        doc.status = DocumentStatus::Published;
        doc.access_level = AccessLevel::Reader;
        doc.published_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        doc.metadata.description = "A \"first\" post\non two lines".to_string();
        doc.metadata.image = "https://example.com/a.png".to_string();
        doc.metadata.tags = vec!["rust".to_string(), "cli: tools".to_string()];
        doc.metadata.set("series", "intro");
        doc.metadata.set("order", 2);
        doc.metadata.set("featured", true);
        doc.metadata.set("aliases", json!(["old-hello", "hi"]));
        doc
    }

    #[test]
    fn parse_defaults() {
        let doc = parse_document("---\ntitle: Only Title\n---\nBody\n", "from-file").unwrap();

        assert_eq!(doc.title, "Only Title");
        assert_eq!(doc.slug, "from-file");
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.access_level, AccessLevel::Public);
        assert!(doc.published_at.is_none());
        assert!(doc.metadata.tags.is_empty());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn template_parses_as_draft() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let text = render_template("My \"Quoted\" Post", "my-quoted-post", date);

        assert!(text.contains("tags: []"));
        assert!(text.contains("description: \"\""));

        let doc = parse_document(&text, "ignored").unwrap();
        assert_eq!(doc.title, "My \"Quoted\" Post");
        assert_eq!(doc.slug, "my-quoted-post");
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.access_level, AccessLevel::Public);
        assert_eq!(doc.published_at.map(|d| d.date_naive()), Some(date));
        assert!(doc.metadata.tags.is_empty());
        assert_eq!(doc.body, "# My \"Quoted\" Post\n\nStart writing here...");
    }

    #[test]
    fn parse_known_fields_and_extras() {
        let content = "---\n\
title: \"Post\"\n\
slug: post\n\
status: published\n\
accessLevel: admin\n\
publishedAt: 2024-01-15\n\
description: Short\n\
tags: [a, b]\n\
series: intro\n\
draftNote: 42\n\
---\n\n# Post\n";

        let doc = parse_document(content, "ignored").unwrap();
        assert_eq!(doc.slug, "post");
        assert_eq!(doc.status, DocumentStatus::Published);
        assert_eq!(doc.access_level, AccessLevel::Admin);
        assert_eq!(
            doc.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(doc.metadata.description, "Short");
        assert_eq!(doc.metadata.tags, vec!["a", "b"]);

        let extra: Vec<_> = doc.metadata.extra().collect();
        assert_eq!(extra, vec![("series", &json!("intro")), ("draftNote", &json!(42))]);
    }

    #[test]
    fn tags_that_are_not_a_list_become_empty() {
        let doc = parse_document("---\ntitle: T\ntags: rust\n---\n", "t").unwrap();
        assert!(doc.metadata.tags.is_empty());
    }

    #[test]
    fn missing_frontmatter_is_all_body() {
        let doc = parse_document("# Just markdown\n", "plain").unwrap();
        assert_eq!(doc.slug, "plain");
        assert_eq!(doc.title, "");
        assert_eq!(doc.body, "# Just markdown");
    }

    #[test]
    fn empty_frontmatter_block() {
        let doc = parse_document("---\n---\nBody", "empty").unwrap();
        assert_eq!(doc.slug, "empty");
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn unterminated_frontmatter_is_an_error() {
        let err = parse_document("---\ntitle: x\n", "x").unwrap_err();
        assert!(matches!(err, CodecError::UnterminatedFrontmatter));
    }

    #[test]
    fn unknown_status_is_an_error() {
        let err = parse_document("---\ntitle: x\nstatus: review\n---\n", "x").unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { field: "status", .. }));
    }

    #[test]
    fn bad_date_is_an_error() {
        let err = parse_document("---\ntitle: x\npublishedAt: soon\n---\n", "x").unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { field: "publishedAt", .. }));
    }

    #[test]
    fn non_mapping_frontmatter_is_an_error() {
        let err = parse_document("---\n- a\n- b\n---\n", "x").unwrap_err();
        assert!(matches!(err, CodecError::NotAMapping));
    }

    #[test]
    fn numeric_title_becomes_string() {
        let doc = parse_document("---\ntitle: 2024\nslug: 2024\n---\n", "x").unwrap();
        assert_eq!(doc.title, "2024");
        assert_eq!(doc.slug, "2024");
    }

    #[test]
    fn body_containing_delimiter() {
        let doc = parse_document("---\ntitle: x\n---\nabove\n\n---\n\nbelow\n", "x").unwrap();
        assert_eq!(doc.body, "above\n\n---\n\nbelow");
    }

    #[test]
    fn parse_rfc3339_published_at() {
        let doc = parse_document(
            "---\ntitle: x\npublishedAt: \"2024-05-02T10:30:00Z\"\n---\n",
            "x",
        )
        .unwrap();
        assert_eq!(
            doc.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn render_layout() {
        let mut doc = Document::new("post", "Post");
        doc.body = "Body".to_string();
        doc.metadata.tags = vec!["a".to_string()];

        let rendered = render_document(&doc);
        assert_eq!(
            rendered,
            "---\ntitle: \"Post\"\nslug: \"post\"\nstatus: \"draft\"\naccessLevel: \"public\"\ntags:\n  - \"a\"\n---\n\nBody\n"
        );
    }

    #[test]
    fn render_skips_empty_optional_fields() {
        let doc = Document::new("post", "Post");
        let rendered = render_document(&doc);

        assert!(!rendered.contains("publishedAt"));
        assert!(!rendered.contains("description"));
        assert!(!rendered.contains("image"));
        assert!(!rendered.contains("tags"));
    }

    #[test]
    fn render_escapes_quotes_and_newlines() {
        let mut doc = Document::new("post", "Say \"hi\": now");
        doc.metadata.description = "line one\nline two".to_string();

        let rendered = render_document(&doc);
        assert!(rendered.contains(r#"title: "Say \"hi\": now""#));
        assert!(rendered.contains(r#"description: "line one\nline two""#));
    }

    #[test]
    fn render_publishes_date_only() {
        let mut doc = Document::new("post", "Post");
        doc.published_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 15, 45, 0).unwrap());

        assert!(render_document(&doc).contains("publishedAt: \"2024-03-01\""));
    }

    #[test]
    fn extras_follow_known_keys_in_order() {
        let doc = sample();
        let rendered = render_document(&doc);

        let series = rendered.find("series:").unwrap();
        let order = rendered.find("order:").unwrap();
        let tags = rendered.find("tags:").unwrap();
        assert!(tags < series && series < order);
    }

    #[test]
    fn roundtrip_sample() {
        let doc = sample();
        let parsed = parse_document(&render_document(&doc), "other").unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn roundtrip_nested_and_empty_extras() {
        let mut doc = Document::new("nested", "Nested");
        doc.metadata.set("seo", json!({"title": "x", "noindex": false}));
        doc.metadata.set("related", json!([]));
        doc.metadata.set("weird key: yes", "value");
        doc.metadata.set("nothing", json!(null));

        let parsed = parse_document(&render_document(&doc), "nested").unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn keyword_keys_are_quoted() {
        let mut doc = Document::new("keys", "Keys");
        doc.metadata.set("null", "v");
        doc.metadata.set("true", 1);
        doc.metadata.set("False", json!(["a"]));

        let rendered = render_document(&doc);
        assert!(rendered.contains("\"null\": \"v\""));
        assert!(rendered.contains("\"true\": 1"));
        assert!(rendered.contains("\"False\":\n  - \"a\""));

        let parsed = parse_document(&rendered, "keys").unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn remote_metadata_never_duplicates_document_keys() {
        let mut doc = Document::new("legacy", "Legacy");
        doc.metadata = Metadata::from_json(&json!({
            "status": "legacy",
            "slug": "other",
            "series": "intro",
        }));

        let rendered = render_document(&doc);
        assert_eq!(rendered.matches("status:").count(), 1);
        assert_eq!(rendered.matches("slug:").count(), 1);

        let parsed = parse_document(&rendered, "legacy").unwrap();
        assert_eq!(parsed.status, DocumentStatus::Draft);
        assert_eq!(parsed.slug, "legacy");
        assert_eq!(parsed, doc);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn text() -> impl Strategy<Value = String> {
            "[ -~\n]{0,40}"
        }

        fn scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                text().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
            ]
        }

        fn extra_value() -> impl Strategy<Value = Value> {
            prop_oneof![
                scalar(),
                prop::collection::vec(scalar(), 0..4).prop_map(Value::from),
            ]
        }

        fn extra_key() -> impl Strategy<Value = String> {
            prop_oneof![
                "x[a-zA-Z0-9_]{0,10}",
                prop::sample::select(YAML_KEYWORDS.to_vec()).prop_map(String::from),
            ]
        }

        fn document() -> impl Strategy<Value = Document> {
            (
                "[a-z0-9-]{1,20}",
                "[ -~]{1,30}",
                "[ -~\n]{0,200}",
                0..3usize,
                0..3usize,
                prop::option::of((2000i32..2100, 1u32..13, 1u32..29)),
                text(),
                text(),
                prop::collection::vec("[ -~]{1,12}", 0..4),
                prop::collection::vec((extra_key(), extra_value()), 0..5),
            )
                .prop_map(
                    |(slug, title, body, status, access, date, description, image, tags, extra)| {
                        let mut doc = Document::new(slug, title);
                        doc.body = body.trim().to_string();
                        doc.status = [
                            DocumentStatus::Draft,
                            DocumentStatus::Published,
                            DocumentStatus::Archived,
                        ][status];
                        doc.access_level =
                            [AccessLevel::Public, AccessLevel::Reader, AccessLevel::Admin][access];
                        doc.published_at = date.map(|(y, m, d)| {
                            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
                        });
                        doc.metadata.description = description;
                        doc.metadata.image = image;
                        doc.metadata.tags = tags;
                        for (key, value) in extra {
                            doc.metadata.set(key, value);
                        }
                        doc
                    },
                )
        }

        proptest! {
            #[test]
            fn decode_encode_roundtrip(doc in document()) {
                let parsed = parse_document(&render_document(&doc), "fallback").unwrap();
                prop_assert_eq!(parsed, doc);
            }
        }
    }
}
