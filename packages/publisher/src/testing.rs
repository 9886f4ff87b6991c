//! Testing utilities including a mock content store.
//!
//! Useful for exercising maintenance and publish flows without a live
//! remote store.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{PublisherError, Result};
use crate::traits::ContentStore;
use crate::types::{NewPost, RemotePost};

/// In-memory [`ContentStore`] with configurable failure injection.
#[derive(Default, Clone)]
pub struct MockContentStore {
    posts: Arc<RwLock<Vec<RemotePost>>>,
    deleted: Arc<RwLock<Vec<(i64, bool)>>>,
    fail_delete_ids: Arc<RwLock<HashSet<i64>>>,
    fail_listing: Arc<RwLock<bool>>,
    fail_listing_pages: Arc<RwLock<HashSet<u32>>>,
    next_id: Arc<RwLock<i64>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(RwLock::new(1)),
            ..Default::default()
        }
    }

    /// Seed the store with existing posts.
    pub fn with_posts(posts: Vec<RemotePost>) -> Self {
        let next = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            posts: Arc::new(RwLock::new(posts)),
            next_id: Arc::new(RwLock::new(next)),
            ..Default::default()
        }
    }

    /// Make deletions of `post_id` fail.
    pub fn fail_delete(&self, post_id: i64) {
        self.fail_delete_ids.write().unwrap().insert(post_id);
    }

    /// Make every listing call fail.
    pub fn fail_listing(&self) {
        *self.fail_listing.write().unwrap() = true;
    }

    /// Make listing calls for one specific page fail.
    pub fn fail_listing_page(&self, page: u32) {
        self.fail_listing_pages.write().unwrap().insert(page);
    }

    /// Deletions recorded so far, as `(post_id, force)` pairs.
    pub fn deleted(&self) -> Vec<(i64, bool)> {
        self.deleted.read().unwrap().clone()
    }

    /// Current post set.
    pub fn posts(&self) -> Vec<RemotePost> {
        self.posts.read().unwrap().clone()
    }

    fn remote_error(detail: String) -> PublisherError {
        PublisherError::Remote(detail.into())
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn list_posts(&self, page: u32, per_page: u32, status: &str) -> Result<Vec<RemotePost>> {
        if *self.fail_listing.read().unwrap() {
            return Err(Self::remote_error("listing unavailable".to_string()));
        }
        if self.fail_listing_pages.read().unwrap().contains(&page) {
            return Err(Self::remote_error(format!("listing of page {} rejected", page)));
        }
        let posts = self.posts.read().unwrap();
        let filtered: Vec<_> = posts
            .iter()
            .filter(|p| status == "any" || p.status == status)
            .cloned()
            .collect();

        let start = ((page - 1) * per_page) as usize;
        Ok(filtered
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect())
    }

    async fn create_post(&self, input: &NewPost) -> Result<RemotePost> {
        let mut next = self.next_id.write().unwrap();
        let id = *next;
        *next += 1;
        drop(next);

        let post = RemotePost {
            id,
            status: input.status.clone(),
            date_gmt: Some(chrono::Utc::now()),
            link: format!("https://mock.example/{}", input.slug),
            slug: input.slug.clone(),
            meta_product_id: input.product_id.clone(),
            body: input.body.clone(),
        };
        self.posts.write().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: i64, input: &NewPost) -> Result<RemotePost> {
        let mut posts = self.posts.write().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| Self::remote_error(format!("post {} not found", post_id)))?;
        post.status = input.status.clone();
        post.body = input.body.clone();
        if !input.slug.is_empty() {
            post.slug = input.slug.clone();
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: i64, force: bool) -> Result<()> {
        if self.fail_delete_ids.read().unwrap().contains(&post_id) {
            return Err(Self::remote_error(format!("delete of {} rejected", post_id)));
        }
        self.posts.write().unwrap().retain(|p| p.id != post_id);
        self.deleted.write().unwrap().push((post_id, force));
        Ok(())
    }
}
