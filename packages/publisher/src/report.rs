//! Reconciliation run artifacts.
//!
//! One immutable report per maintenance run: what was found, what was
//! kept, and what was (or would have been) deleted. Serialized once to a
//! timestamped JSON file for audit; never re-opened for update.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::dedupe::{DedupePlan, DuplicateGroup, PostRef};
use crate::error::Result;

/// Per-group decision as recorded in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGroup {
    pub product_id: String,
    pub count: usize,
    pub keep: PostRef,
    pub delete: Vec<PostRef>,
}

impl From<&DuplicateGroup> for ReportGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            product_id: group.product_id.clone(),
            count: 1 + group.delete.len(),
            keep: group.keep.clone(),
            delete: group.delete.clone(),
        }
    }
}

/// Per-deleted-record outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRecord {
    #[serde(flatten)]
    pub post: PostRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Immutable snapshot of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub base_url: String,
    pub fetched_posts: usize,
    pub skipped_no_id: usize,
    pub duplicate_groups: usize,
    pub apply: bool,
    pub force: bool,
    pub groups: Vec<ReportGroup>,
    pub kept: Vec<PostRef>,
    pub deleted: Vec<DeletionRecord>,
    pub generated_at: String,
}

impl ReconciliationReport {
    /// Snapshot a plan's decisions; deletion outcomes are appended as the
    /// caller executes (or skips) them.
    pub fn new(base_url: impl Into<String>, plan: &DedupePlan, apply: bool, force: bool) -> Self {
        Self {
            base_url: base_url.into(),
            fetched_posts: plan.fetched,
            skipped_no_id: plan.skipped_no_id,
            duplicate_groups: plan.groups.len(),
            apply,
            force,
            groups: plan.groups.iter().map(ReportGroup::from).collect(),
            kept: plan.groups.iter().map(|g| g.keep.clone()).collect(),
            deleted: Vec::new(),
            generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }

    /// Record a completed deletion.
    pub fn push_deleted(&mut self, post: &PostRef) {
        self.deleted.push(DeletionRecord {
            post: post.clone(),
            deleted_at: Some(Local::now().format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            dry_run: None,
            error: None,
        });
    }

    /// Record a deletion that was only simulated.
    pub fn push_dry_run(&mut self, post: &PostRef) {
        self.deleted.push(DeletionRecord {
            post: post.clone(),
            deleted_at: None,
            dry_run: Some(true),
            error: None,
        });
    }

    /// Record a deletion the remote store rejected.
    pub fn push_error(&mut self, post: &PostRef, detail: String) {
        self.deleted.push(DeletionRecord {
            post: post.clone(),
            deleted_at: None,
            dry_run: None,
            error: Some(detail),
        });
    }

    /// Number of deletions that actually completed.
    pub fn deleted_count(&self) -> usize {
        self.deleted.iter().filter(|d| d.deleted_at.is_some()).count()
    }

    /// Number of deletions that errored.
    pub fn error_count(&self) -> usize {
        self.deleted.iter().filter(|d| d.error.is_some()).count()
    }

    /// Write the report to `dir` as pretty JSON named
    /// `dedupe_report_<timestamp>.json`, creating the directory if needed.
    /// Returns the written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "dedupe_report_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(path = %path.display(), "reconciliation report written");
        Ok(path)
    }
}
