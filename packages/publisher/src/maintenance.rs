//! Maintenance runs: duplicate cleanup and ledger backfill.
//!
//! A run fetches the remote record set, plans duplicate resolution, and
//! either reports what would happen (dry run, the default) or executes the
//! deletions. Per-record deletion failures are recorded in the report and
//! the run continues; only an unreachable store is fatal.

use crate::dedupe::{self, DedupePlan};
use crate::error::Result;
use crate::identity;
use crate::ledger::{Ledger, LedgerState};
use crate::report::ReconciliationReport;
use crate::traits::ContentStore;

/// Parameters for one dedupe run.
#[derive(Debug, Clone)]
pub struct DedupeOptions {
    /// Execute deletions instead of only reporting them
    pub apply: bool,
    /// Delete permanently instead of trashing
    pub force: bool,
    /// Remote status filter passed to the listing
    pub status: String,
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            apply: false,
            force: false,
            status: "any".to_string(),
            per_page: 100,
            max_pages: 50,
        }
    }
}

/// Reconciliation operations over one publication target.
pub struct MaintenanceService<S> {
    store: S,
    base_url: String,
}

impl<S: ContentStore> MaintenanceService<S> {
    pub fn new(store: S, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    /// Fetch the remote record set and plan duplicate resolution without
    /// touching anything.
    pub async fn scan(&self, opts: &DedupeOptions) -> Result<DedupePlan> {
        let posts = self
            .store
            .fetch_all(opts.per_page, opts.max_pages, &opts.status)
            .await?;
        Ok(dedupe::plan(&posts))
    }

    /// Run duplicate resolution, executing deletions when `opts.apply`.
    ///
    /// The returned report carries every keep/delete decision and, for
    /// applied runs, the per-deletion outcome.
    pub async fn run_dedupe(&self, opts: &DedupeOptions) -> Result<ReconciliationReport> {
        let plan = self.scan(opts).await?;
        tracing::info!(
            fetched = plan.fetched,
            skipped_no_id = plan.skipped_no_id,
            groups = plan.groups.len(),
            apply = opts.apply,
            "duplicate plan computed"
        );

        let mut report = ReconciliationReport::new(&self.base_url, &plan, opts.apply, opts.force);

        for group in &plan.groups {
            for target in &group.delete {
                if !opts.apply {
                    report.push_dry_run(target);
                    continue;
                }
                match self.store.delete_post(target.post_id, opts.force).await {
                    Ok(()) => report.push_deleted(target),
                    Err(e) => {
                        tracing::error!(
                            product_id = %group.product_id,
                            post_id = target.post_id,
                            error = %e,
                            "delete failed"
                        );
                        report.push_error(target, e.to_string());
                    }
                }
            }
        }

        Ok(report)
    }

    /// Align the ledger with remote ground truth: every remote record that
    /// resolves to a product id is marked in the ledger. Existing terminal
    /// rows are preserved by the bulk merge. Returns the number of rows
    /// submitted.
    pub async fn backfill_ledger(
        &self,
        ledger: &Ledger,
        state: LedgerState,
        per_page: u32,
        max_pages: u32,
    ) -> Result<usize> {
        let posts = self.store.fetch_all(per_page, max_pages, "any").await?;

        let mut pairs: Vec<(String, Option<i64>)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for post in &posts {
            if let Some(product_id) = identity::resolve(post) {
                // First occurrence wins; the listing is newest-first, so
                // this favors the most recent copy's remote id.
                if seen.insert(product_id.clone()) {
                    pairs.push((product_id, Some(post.id)));
                }
            }
        }

        let marked = ledger.bulk_mark_posted(&pairs, state).await?;
        tracing::info!(
            scanned = posts.len(),
            marked,
            state = %state,
            "ledger backfill complete"
        );
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockContentStore;
    use crate::types::RemotePost;
    use chrono::NaiveDateTime;

    fn post(id: i64, status: &str, slug: &str, meta: Option<&str>, date: &str) -> RemotePost {
        RemotePost {
            id,
            status: status.to_string(),
            date_gmt: NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|d| d.and_utc()),
            link: format!("https://example.com/{slug}"),
            slug: slug.to_string(),
            meta_product_id: meta.map(str::to_string),
            body: String::new(),
        }
    }

    /// Three copies of ipx-555 (identified via meta), one unique post
    /// (identified via slug), one unresolvable page.
    fn duplicated_site() -> MockContentStore {
        MockContentStore::with_posts(vec![
            post(9, "publish", "new-review", Some("ipx-555"), "2026-03-01T00:00:00"),
            post(5, "draft", "old-review", Some("ipx-555"), "2026-01-01T00:00:00"),
            post(7, "draft", "older-review", Some("ipx-555"), "2025-12-01T00:00:00"),
            post(3, "publish", "unique-mide-100", None, "2026-02-01T00:00:00"),
            post(4, "publish", "about-us", None, "2026-02-01T00:00:00"),
        ])
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let store = duplicated_site();
        let service = MaintenanceService::new(store.clone(), "https://example.com");

        let report = service.run_dedupe(&DedupeOptions::default()).await.unwrap();

        assert_eq!(report.duplicate_groups, 1);
        assert_eq!(report.skipped_no_id, 1);
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.deleted_count(), 0);
        assert!(store.deleted().is_empty());
        assert_eq!(store.posts().len(), 5);
    }

    #[tokio::test]
    async fn applied_run_deletes_losers_and_keeps_survivor() {
        let store = duplicated_site();
        let service = MaintenanceService::new(store.clone(), "https://example.com");

        let opts = DedupeOptions {
            apply: true,
            ..Default::default()
        };
        let report = service.run_dedupe(&opts).await.unwrap();

        assert_eq!(report.kept[0].post_id, 9);
        assert_eq!(report.deleted_count(), 2);

        let mut deleted: Vec<i64> = store.deleted().iter().map(|(id, _)| *id).collect();
        deleted.sort();
        assert_eq!(deleted, vec![5, 7]);
        // Deletes default to trash, not permanent.
        assert!(store.deleted().iter().all(|(_, force)| !force));
    }

    #[tokio::test]
    async fn delete_failure_is_recorded_and_run_continues() {
        let store = duplicated_site();
        store.fail_delete(5);
        let service = MaintenanceService::new(store.clone(), "https://example.com");

        let opts = DedupeOptions {
            apply: true,
            ..Default::default()
        };
        let report = service.run_dedupe(&opts).await.unwrap();

        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(store.deleted(), vec![(7, false)]);
    }

    #[tokio::test]
    async fn unreachable_store_is_fatal() {
        let store = duplicated_site();
        store.fail_listing();
        let service = MaintenanceService::new(store, "https://example.com");

        assert!(service.run_dedupe(&DedupeOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn backfill_marks_resolved_ids_once() {
        let store = duplicated_site();
        let service = MaintenanceService::new(store, "https://example.com");
        let ledger = Ledger::in_memory().await.unwrap();

        let marked = service
            .backfill_ledger(&ledger, LedgerState::Published, 100, 5)
            .await
            .unwrap();

        // Two resolvable ids; duplicates collapse, "about-us" is skipped.
        assert_eq!(marked, 2);
        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.published, 2);

        // Re-running changes nothing.
        let service = {
            let store = duplicated_site();
            MaintenanceService::new(store, "https://example.com")
        };
        service
            .backfill_ledger(&ledger, LedgerState::Published, 100, 5)
            .await
            .unwrap();
        assert_eq!(ledger.stats().await.unwrap(), stats);
    }

    #[tokio::test]
    async fn backfill_preserves_existing_terminal_rows() {
        let store = duplicated_site();
        let service = MaintenanceService::new(store, "https://example.com");
        let ledger = Ledger::in_memory().await.unwrap();
        ledger
            .record_success("ipx-555", Some(1), LedgerState::Drafted)
            .await
            .unwrap();

        service
            .backfill_ledger(&ledger, LedgerState::Published, 100, 5)
            .await
            .unwrap();

        let entry = ledger.get("ipx-555").await.unwrap().unwrap();
        assert_eq!(entry.state, LedgerState::Drafted);
        assert_eq!(entry.remote_id, Some(1));
    }

    #[tokio::test]
    async fn scan_matches_run_dedupe_plan() {
        let store = duplicated_site();
        let service = MaintenanceService::new(store, "https://example.com");

        let plan = service.scan(&DedupeOptions::default()).await.unwrap();
        let report = service.run_dedupe(&DedupeOptions::default()).await.unwrap();

        assert_eq!(plan.groups.len(), report.duplicate_groups);
        assert_eq!(plan.delete_count(), report.deleted.len());
    }
}
