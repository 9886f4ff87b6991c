//! Trait abstraction over the remote content store.
//!
//! Maintenance and publish flows depend on this seam rather than on a
//! concrete HTTP client, so they are testable against
//! [`MockContentStore`](crate::testing::MockContentStore). The remote store
//! is treated as eventually consistent and idempotent-safe to re-query.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{NewPost, RemotePost};

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch one page of posts (1-based). An empty vec means the page is
    /// past the end of the collection.
    async fn list_posts(&self, page: u32, per_page: u32, status: &str) -> Result<Vec<RemotePost>>;

    /// Create a post. Returns the created record as the store sees it.
    async fn create_post(&self, input: &NewPost) -> Result<RemotePost>;

    /// Update an existing post.
    async fn update_post(&self, post_id: i64, input: &NewPost) -> Result<RemotePost>;

    /// Delete a post. `force = false` trashes it, `force = true` deletes
    /// permanently.
    async fn delete_post(&self, post_id: i64, force: bool) -> Result<()>;

    /// Paginate through posts until an empty or short page.
    ///
    /// A page-level error past the first page ends the listing with what
    /// was already fetched (logged, not fatal); an error on page 1 means
    /// the store is unreachable and propagates.
    async fn fetch_all(&self, per_page: u32, max_pages: u32, status: &str) -> Result<Vec<RemotePost>> {
        let mut all = Vec::new();
        for page in 1..=max_pages {
            let posts = match self.list_posts(page, per_page, status).await {
                Ok(posts) => posts,
                Err(e) if page > 1 => {
                    tracing::warn!(page, error = %e, "listing stopped early");
                    break;
                }
                Err(e) => return Err(e),
            };
            if posts.is_empty() {
                break;
            }
            let short_page = (posts.len() as u32) < per_page;
            all.extend(posts);
            if short_page {
                break;
            }
        }
        tracing::info!(count = all.len(), status, "fetched remote posts");
        Ok(all)
    }
}
