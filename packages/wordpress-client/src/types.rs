use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A rendered field as returned by the WP REST API (`{"rendered": "..."}`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A post as returned by the WP REST API.
///
/// Fields are optional because list requests use `_fields` to trim the
/// payload, and `context=edit` is not always available.
#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    /// Naive UTC timestamp string, e.g. `2026-08-28T12:00:00`
    #[serde(default)]
    pub date_gmt: Option<String>,
    /// Site-local timestamp string, used as a fallback when `date_gmt`
    /// is absent from the trimmed payload
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<Rendered>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    #[serde(default)]
    pub featured_media: Option<i64>,
}

impl WpPost {
    /// Look up a string value in the post's meta field.
    ///
    /// WP returns `meta` as an object under `context=edit`, but some
    /// configurations return an (empty) array instead.
    pub fn meta_str(&self, key: &str) -> Option<String> {
        let meta = self.meta.as_ref()?.as_object()?;
        match meta.get(key)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Input for creating or updating a post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, String>>,
}
