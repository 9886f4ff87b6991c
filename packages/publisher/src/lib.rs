//! Idempotency ledger and duplicate resolution for catalog publishing.
//!
//! The pipeline around this library ingests catalog items, generates
//! derivative content, and publishes each item to one or more independent
//! sites. This crate owns the hard part: at-most-once publication per
//! logical item per site under concurrent, crash-prone execution, plus
//! retroactive detection and resolution of duplicates that slipped through
//! (or pre-existed) on the remote store.
//!
//! # Components
//!
//! - [`ledger`] - persisted per-site state machine arbitrating publication
//!   attempts ([`Ledger::try_start`] is the single concurrency-correctness
//!   contract of the system)
//! - [`identity`] - canonical product id resolution from metadata, slug,
//!   or body text
//! - [`dedupe`] - groups same-identity remote records and picks a
//!   deterministic survivor
//! - [`report`] - immutable per-run reconciliation artifacts
//! - [`maintenance`] - dedupe runs and ledger backfill against a
//!   [`ContentStore`]
//! - [`publish`] - the guarded single-item publication worker
//! - [`testing`] - [`MockContentStore`] for exercising flows offline
//!
//! # Usage
//!
//! ```rust,ignore
//! use publisher::{Ledger, MaintenanceService, DedupeOptions};
//! use publisher::remote::WordPressStore;
//! use wordpress_client::WpClient;
//!
//! let ledger = Ledger::open(&db_path).await?;
//! let wp = WpClient::new(&base_url, &user, &app_password);
//! let service = MaintenanceService::new(WordPressStore::new(wp), &base_url);
//!
//! // Dry run: compute and report the plan, delete nothing.
//! let report = service.run_dedupe(&DedupeOptions::default()).await?;
//! report.write_to(&report_dir)?;
//! ```

pub mod dedupe;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod maintenance;
pub mod publish;
pub mod remote;
pub mod report;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use dedupe::{plan, status_rank, DedupePlan, DuplicateGroup, PostRef};
pub use error::{PublisherError, Result};
pub use ledger::{
    default_failed_retry_window, default_processing_ttl, Ledger, LedgerEntry, LedgerState,
    LedgerStats,
};
pub use maintenance::{DedupeOptions, MaintenanceService};
pub use publish::{publish_one, PublishOptions, PublishOutcome};
pub use report::{DeletionRecord, ReconciliationReport, ReportGroup};
pub use testing::MockContentStore;
pub use traits::ContentStore;
pub use types::{NewPost, RemotePost};

#[cfg(feature = "wordpress")]
pub use remote::WordPressStore;
