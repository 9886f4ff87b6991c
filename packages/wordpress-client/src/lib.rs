//! Pure WordPress REST API client.
//!
//! A minimal client for the `wp/v2` REST API using application passwords.
//! Supports paginated post listing, post create/update/delete, and honors
//! `Retry-After` on rate limiting.
//!
//! # Example
//!
//! ```rust,ignore
//! use wordpress_client::WpClient;
//!
//! let wp = WpClient::new("https://example.com", "admin", "app-password");
//!
//! let posts = wp.list_posts(1, 100, "any").await?;
//! for post in &posts {
//!     println!("{} {}", post.id, post.slug.as_deref().unwrap_or(""));
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{Result, WpError};
pub use types::{PostInput, Rendered, WpPost};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Method, Response, StatusCode};
use std::time::Duration;

/// Fields requested when listing posts, keeping payloads small while still
/// carrying everything identifier resolution needs.
const LIST_FIELDS: &str = "id,status,date_gmt,date,link,slug,meta,content";

/// Upper bound on the `Retry-After` wait; anything longer is a server
/// misconfiguration we refuse to sleep through.
const MAX_RETRY_AFTER_SECS: u64 = 120;

pub struct WpClient {
    client: reqwest::Client,
    api_url: String,
    auth_header: String,
}

impl WpClient {
    pub fn new(base_url: &str, username: &str, app_password: &str) -> Self {
        let credentials = format!("{}:{}", username, app_password);
        let auth_header = format!("Basic {}", BASE64.encode(credentials.as_bytes()));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: format!("{}/wp-json/wp/v2", base_url.trim_end_matches('/')),
            auth_header,
        }
    }

    /// Execute an authenticated request, retrying once per 429 response
    /// after the interval the server asks for.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = format!("{}/{}", self.api_url, endpoint);
        loop {
            let mut req = self
                .client
                .request(method.clone(), &url)
                .header("Authorization", &self.auth_header)
                .query(params);
            if let Some(json) = body {
                req = req.json(json);
            }
            let resp = req.send().await?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                let wait = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60)
                    .min(MAX_RETRY_AFTER_SECS);
                tracing::warn!(wait_secs = wait, %url, "WP API rate limited, waiting");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return Ok(resp);
        }
    }

    async fn into_api_error(resp: Response) -> WpError {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        WpError::Api { status, message }
    }

    /// Fetch one page of posts.
    ///
    /// Requests `context=edit` first (needed for `meta`), falling back to
    /// the default context when the credentials do not allow it. A 400
    /// response means the page is past the end of the collection and yields
    /// an empty vec.
    pub async fn list_posts(&self, page: u32, per_page: u32, status: &str) -> Result<Vec<WpPost>> {
        let mut params = vec![
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("status", status.to_string()),
            ("orderby", "date".to_string()),
            ("order", "desc".to_string()),
            ("_fields", LIST_FIELDS.to_string()),
            ("context", "edit".to_string()),
        ];

        let mut resp = self.request(Method::GET, "posts", &params, None).await?;
        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            params.pop();
            resp = self.request(Method::GET, "posts", &params, None).await?;
        }

        if resp.status() == StatusCode::BAD_REQUEST {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(Self::into_api_error(resp).await);
        }

        let posts: Vec<WpPost> = resp.json().await?;
        Ok(posts)
    }

    /// Fetch a single post with full edit context.
    pub async fn get_post(&self, post_id: i64) -> Result<WpPost> {
        let params = [("context", "edit".to_string())];
        let resp = self
            .request(Method::GET, &format!("posts/{}", post_id), &params, None)
            .await?;
        if !resp.status().is_success() {
            return Err(Self::into_api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Create a post. Returns the created post as WP sees it.
    pub async fn create_post(&self, input: &PostInput) -> Result<WpPost> {
        tracing::info!(title = %input.title, status = %input.status, "WP create post");
        let body = serde_json::to_value(input)?;
        let resp = self.request(Method::POST, "posts", &[], Some(&body)).await?;
        if !resp.status().is_success() {
            return Err(Self::into_api_error(resp).await);
        }
        let post: WpPost = resp.json().await?;
        tracing::info!(post_id = post.id, "WP post created");
        Ok(post)
    }

    /// Update an existing post.
    pub async fn update_post(&self, post_id: i64, input: &PostInput) -> Result<WpPost> {
        let body = serde_json::to_value(input)?;
        let resp = self
            .request(Method::POST, &format!("posts/{}", post_id), &[], Some(&body))
            .await?;
        if !resp.status().is_success() {
            return Err(Self::into_api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Delete a post. `force = false` moves it to trash, `force = true`
    /// deletes permanently.
    pub async fn delete_post(&self, post_id: i64, force: bool) -> Result<()> {
        let params = [("force", force.to_string())];
        let resp = self
            .request(Method::DELETE, &format!("posts/{}", post_id), &params, None)
            .await?;
        if !resp.status().is_success() {
            return Err(Self::into_api_error(resp).await);
        }
        tracing::info!(post_id, force, "WP post deleted");
        Ok(())
    }
}
