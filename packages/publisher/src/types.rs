//! Core data types shared across the publisher library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only projection of a record held by the remote content store.
///
/// Produced by a [`ContentStore`](crate::traits::ContentStore)
/// implementation, consumed by identifier resolution and duplicate
/// planning. Never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePost {
    /// Remote store record id
    pub id: i64,

    /// Lifecycle status as the remote store reports it
    /// (e.g. `publish`, `draft`, `trash`)
    pub status: String,

    /// Creation time, when the remote store exposes one
    pub date_gmt: Option<DateTime<Utc>>,

    /// Public permalink
    pub link: String,

    /// URL slug
    pub slug: String,

    /// Canonical product id a prior publisher write stored in the
    /// record's structured metadata, if any
    pub meta_product_id: Option<String>,

    /// Rendered body text
    pub body: String,
}

/// Input for creating or updating a post on the remote store.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub slug: String,

    /// Remote lifecycle status to request (`draft` or `publish`)
    pub status: String,

    pub categories: Vec<i64>,
    pub tags: Vec<i64>,
    pub featured_media: Option<i64>,

    /// Canonical product id to store in the record's structured metadata
    pub product_id: Option<String>,
}

impl NewPost {
    /// Whether this post is requested to go publicly live on creation.
    pub fn is_live(&self) -> bool {
        self.status == "publish"
    }
}
