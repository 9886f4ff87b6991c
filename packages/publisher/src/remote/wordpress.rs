//! [`ContentStore`] adapter over the pure WordPress REST client.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use wordpress_client::{PostInput, WpClient, WpPost};

use crate::error::{PublisherError, Result};
use crate::traits::ContentStore;
use crate::types::{NewPost, RemotePost};

/// Meta key under which publisher writes store the canonical product id.
/// Existing remote data uses this key; changing it orphans those records.
pub const PRODUCT_ID_META_KEY: &str = "fanza_product_id";

/// WordPress-backed content store.
pub struct WordPressStore {
    client: WpClient,
}

impl WordPressStore {
    pub fn new(client: WpClient) -> Self {
        Self { client }
    }

    fn map_post(post: WpPost) -> RemotePost {
        let meta_product_id = post.meta_str(PRODUCT_ID_META_KEY);
        // `date_gmt` is a naive UTC string; `date` (site-local) is only a
        // fallback when the trimmed payload lacks it.
        let date_gmt = post
            .date_gmt
            .as_deref()
            .or(post.date.as_deref())
            .and_then(parse_wp_timestamp);

        RemotePost {
            id: post.id,
            status: post.status.unwrap_or_default(),
            date_gmt,
            link: post.link.unwrap_or_default(),
            slug: post.slug.unwrap_or_default(),
            meta_product_id,
            body: post.content.map(|c| c.rendered).unwrap_or_default(),
        }
    }

    fn map_input(input: &NewPost) -> PostInput {
        let meta = input.product_id.as_ref().map(|id| {
            let mut m = HashMap::new();
            m.insert(PRODUCT_ID_META_KEY.to_string(), id.clone());
            m
        });

        PostInput {
            title: input.title.clone(),
            content: input.body.clone(),
            excerpt: input.excerpt.clone(),
            slug: input.slug.clone(),
            status: input.status.clone(),
            categories: (!input.categories.is_empty()).then(|| input.categories.clone()),
            tags: (!input.tags.is_empty()).then(|| input.tags.clone()),
            featured_media: input.featured_media,
            meta,
        }
    }
}

fn parse_wp_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|d| d.and_utc())
}

#[async_trait]
impl ContentStore for WordPressStore {
    async fn list_posts(&self, page: u32, per_page: u32, status: &str) -> Result<Vec<RemotePost>> {
        let posts = self
            .client
            .list_posts(page, per_page, status)
            .await
            .map_err(PublisherError::remote)?;
        Ok(posts.into_iter().map(Self::map_post).collect())
    }

    async fn create_post(&self, input: &NewPost) -> Result<RemotePost> {
        let created = self
            .client
            .create_post(&Self::map_input(input))
            .await
            .map_err(PublisherError::remote)?;
        Ok(Self::map_post(created))
    }

    async fn update_post(&self, post_id: i64, input: &NewPost) -> Result<RemotePost> {
        let updated = self
            .client
            .update_post(post_id, &Self::map_input(input))
            .await
            .map_err(PublisherError::remote)?;
        Ok(Self::map_post(updated))
    }

    async fn delete_post(&self, post_id: i64, force: bool) -> Result<()> {
        self.client
            .delete_post(post_id, force)
            .await
            .map_err(PublisherError::remote)
    }
}
