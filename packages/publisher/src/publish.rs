//! Publication worker: one guarded attempt per product id.
//!
//! The ledger arbitrates the attempt (`try_start`), the remote store
//! performs it, and the outcome is reported back (`record_success` /
//! `record_failure`). Remote failures are recorded and returned as
//! [`PublishOutcome::Failed`], never escalated; only ledger storage
//! failures propagate.

use chrono::Duration;

use crate::error::Result;
use crate::ledger::{default_processing_ttl, Ledger, LedgerState};
use crate::traits::ContentStore;
use crate::types::NewPost;

/// Behavior switches for one publication attempt.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Simulate: claim the id, perform no remote mutation, record `dry_run`
    pub dry_run: bool,
    /// Staleness threshold for competing `processing` claims
    pub processing_ttl: Duration,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            processing_ttl: default_processing_ttl(),
        }
    }
}

/// Result of one publication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The post was created on the remote store
    Created { post_id: i64, live: bool },
    /// The ledger refused the claim: already posted, in flight elsewhere,
    /// or inside a retry window
    Skipped,
    /// Simulated attempt, ledger marked `dry_run`
    DryRun,
    /// The remote store rejected the attempt; recorded as `failed`
    Failed { detail: String },
}

/// Attempt to publish one item, guarded by the ledger.
pub async fn publish_one<S: ContentStore>(
    ledger: &Ledger,
    store: &S,
    product_id: &str,
    draft: &NewPost,
    opts: &PublishOptions,
) -> Result<PublishOutcome> {
    if !ledger.try_start(product_id, opts.processing_ttl).await? {
        tracing::debug!(product_id, "skipped: ledger refused claim");
        return Ok(PublishOutcome::Skipped);
    }

    if opts.dry_run {
        ledger
            .record_success(product_id, None, LedgerState::DryRun)
            .await?;
        tracing::info!(product_id, "dry run: no remote mutation");
        return Ok(PublishOutcome::DryRun);
    }

    match store.create_post(draft).await {
        Ok(post) => {
            let live = draft.is_live();
            let state = if live {
                LedgerState::Published
            } else {
                LedgerState::Drafted
            };
            ledger
                .record_success(product_id, Some(post.id), state)
                .await?;
            Ok(PublishOutcome::Created {
                post_id: post.id,
                live,
            })
        }
        Err(e) => {
            let detail = e.to_string();
            ledger.record_failure(product_id, &detail).await?;
            Ok(PublishOutcome::Failed { detail })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::default_failed_retry_window;
    use crate::testing::MockContentStore;

    fn draft(product_id: &str, status: &str) -> NewPost {
        NewPost {
            title: format!("Review of {product_id}"),
            body: "<p>body</p>".to_string(),
            slug: format!("review-{product_id}"),
            status: status.to_string(),
            product_id: Some(product_id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn successful_draft_publication() {
        let ledger = Ledger::in_memory().await.unwrap();
        let store = MockContentStore::new();

        let outcome = publish_one(
            &ledger,
            &store,
            "abc-123",
            &draft("abc-123", "draft"),
            &PublishOptions::default(),
        )
        .await
        .unwrap();

        let PublishOutcome::Created { post_id, live } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert!(!live);

        let entry = ledger.get("abc-123").await.unwrap().unwrap();
        assert_eq!(entry.state, LedgerState::Drafted);
        assert_eq!(entry.remote_id, Some(post_id));
    }

    #[tokio::test]
    async fn live_status_records_published() {
        let ledger = Ledger::in_memory().await.unwrap();
        let store = MockContentStore::new();

        publish_one(
            &ledger,
            &store,
            "abc-123",
            &draft("abc-123", "publish"),
            &PublishOptions::default(),
        )
        .await
        .unwrap();

        let entry = ledger.get("abc-123").await.unwrap().unwrap();
        assert_eq!(entry.state, LedgerState::Published);
    }

    #[tokio::test]
    async fn second_attempt_is_skipped() {
        let ledger = Ledger::in_memory().await.unwrap();
        let store = MockContentStore::new();
        let opts = PublishOptions::default();

        publish_one(&ledger, &store, "abc-123", &draft("abc-123", "draft"), &opts)
            .await
            .unwrap();
        let second = publish_one(&ledger, &store, "abc-123", &draft("abc-123", "draft"), &opts)
            .await
            .unwrap();

        assert_eq!(second, PublishOutcome::Skipped);
        assert_eq!(store.posts().len(), 1);
    }

    #[tokio::test]
    async fn dry_run_mutates_nothing_remote() {
        let ledger = Ledger::in_memory().await.unwrap();
        let store = MockContentStore::new();
        let opts = PublishOptions {
            dry_run: true,
            ..Default::default()
        };

        let outcome = publish_one(&ledger, &store, "abc-123", &draft("abc-123", "draft"), &opts)
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::DryRun);
        assert!(store.posts().is_empty());
        let entry = ledger.get("abc-123").await.unwrap().unwrap();
        assert_eq!(entry.state, LedgerState::DryRun);

        // A dry run never blocks the real attempt.
        let real = publish_one(
            &ledger,
            &store,
            "abc-123",
            &draft("abc-123", "draft"),
            &PublishOptions::default(),
        )
        .await
        .unwrap();
        assert!(matches!(real, PublishOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn remote_failure_is_recorded_and_blocks_retry() {
        let ledger = Ledger::in_memory().await.unwrap();
        let failing = FailingStore;

        let outcome = publish_one(
            &ledger,
            &failing,
            "abc-123",
            &draft("abc-123", "draft"),
            &PublishOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PublishOutcome::Failed { .. }));
        let entry = ledger.get("abc-123").await.unwrap().unwrap();
        assert_eq!(entry.state, LedgerState::Failed);
        assert!(entry.error_detail.is_some());

        // Inside the retry window the id stays blocked.
        assert!(ledger
            .is_posted(
                "abc-123",
                default_processing_ttl(),
                default_failed_retry_window()
            )
            .await
            .unwrap());
    }

    /// A store whose create always fails.
    struct FailingStore;

    #[async_trait::async_trait]
    impl ContentStore for FailingStore {
        async fn list_posts(
            &self,
            _page: u32,
            _per_page: u32,
            _status: &str,
        ) -> Result<Vec<crate::types::RemotePost>> {
            Ok(Vec::new())
        }

        async fn create_post(&self, _input: &NewPost) -> Result<crate::types::RemotePost> {
            Err(crate::error::PublisherError::Remote("HTTP 502".into()))
        }

        async fn update_post(
            &self,
            _post_id: i64,
            _input: &NewPost,
        ) -> Result<crate::types::RemotePost> {
            Err(crate::error::PublisherError::Remote("HTTP 502".into()))
        }

        async fn delete_post(&self, _post_id: i64, _force: bool) -> Result<()> {
            Ok(())
        }
    }
}
