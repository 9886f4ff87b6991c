//! Duplicate detection and survivor selection.
//!
//! Groups remote records by resolved product id and picks one canonical
//! survivor per group. Pure with respect to its inputs: it computes a
//! deletion plan but never calls the remote store or the ledger, so a
//! dry run computes the identical plan an applied run would.
//!
//! Survivor ordering, in precedence order:
//!
//! 1. status rank — a live record must never lose to a draft;
//! 2. creation time ascending — the oldest copy carries the most external
//!    inbound links;
//! 3. remote id ascending — final deterministic tie-break.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;
use crate::types::RemotePost;

/// Total order over remote lifecycle statuses; lower rank survives.
pub fn status_rank(status: &str) -> u8 {
    match status.to_lowercase().as_str() {
        "publish" => 0,
        "pending" => 1,
        "draft" => 2,
        "private" => 3,
        "future" => 4,
        "any" => 5,
        "trash" => 9,
        _ => 8,
    }
}

/// Per-record projection carried through groups and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRef {
    pub post_id: i64,
    pub status: String,
    pub date_gmt: Option<DateTime<Utc>>,
    pub link: String,
    pub slug: String,
    pub product_id: String,
}

impl PostRef {
    fn from_post(post: &RemotePost, product_id: String) -> Self {
        Self {
            post_id: post.id,
            status: post.status.clone(),
            date_gmt: post.date_gmt,
            link: post.link.clone(),
            slug: post.slug.clone(),
            product_id,
        }
    }

    /// Composite sort key; the first record in ascending order survives.
    fn sort_key(&self) -> (u8, DateTime<Utc>, i64) {
        (
            status_rank(&self.status),
            // Missing creation times sort last among equal statuses.
            self.date_gmt.unwrap_or(DateTime::<Utc>::MAX_UTC),
            self.post_id,
        )
    }
}

/// A set of records sharing one product id, with exactly one survivor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub product_id: String,
    pub keep: PostRef,
    pub delete: Vec<PostRef>,
}

/// Outcome of one planning pass over a remote record set.
#[derive(Debug, Clone)]
pub struct DedupePlan {
    /// Total records examined
    pub fetched: usize,
    /// Records with no resolvable product id, excluded from grouping
    pub skipped_no_id: usize,
    /// Groups with more than one record, ordered by product id
    pub groups: Vec<DuplicateGroup>,
}

impl DedupePlan {
    /// Total number of records slated for deletion.
    pub fn delete_count(&self) -> usize {
        self.groups.iter().map(|g| g.delete.len()).sum()
    }
}

/// Build a deletion plan for a remote record set.
pub fn plan(posts: &[RemotePost]) -> DedupePlan {
    let mut by_id: BTreeMap<String, Vec<PostRef>> = BTreeMap::new();
    let mut skipped_no_id = 0;

    for post in posts {
        match identity::resolve(post) {
            Some(product_id) => {
                by_id
                    .entry(product_id.clone())
                    .or_default()
                    .push(PostRef::from_post(post, product_id));
            }
            None => skipped_no_id += 1,
        }
    }

    let groups = by_id
        .into_iter()
        .filter(|(_, refs)| refs.len() > 1)
        .map(|(product_id, mut refs)| {
            refs.sort_by_key(PostRef::sort_key);
            let keep = refs.remove(0);
            tracing::debug!(
                product_id,
                keep_id = keep.post_id,
                delete_count = refs.len(),
                "duplicate group planned"
            );
            DuplicateGroup {
                product_id,
                keep,
                delete: refs,
            }
        })
        .collect();

    DedupePlan {
        fetched: posts.len(),
        skipped_no_id,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn post(id: i64, status: &str, slug: &str, date: Option<&str>) -> RemotePost {
        RemotePost {
            id,
            status: status.to_string(),
            date_gmt: date.map(|d| {
                NaiveDateTime::parse_from_str(d, "%Y-%m-%dT%H:%M:%S")
                    .unwrap_or_else(|_| panic!("bad test date: {d}"))
                    .and_utc()
            }),
            link: format!("https://example.com/{slug}"),
            slug: slug.to_string(),
            meta_product_id: None,
            body: String::new(),
        }
    }

    #[test]
    fn published_survives_regardless_of_age() {
        // Scenario: the published copy is the newest, drafts are older.
        let posts = vec![
            post(9, "publish", "a-ipx-555", Some("2026-03-01T00:00:00")),
            post(5, "draft", "b-ipx-555", Some("2026-01-01T00:00:00")),
            post(7, "draft", "c-ipx-555", Some("2025-12-01T00:00:00")),
        ];
        // All three resolve to different slugs; force a shared id via meta.
        let posts: Vec<_> = posts
            .into_iter()
            .map(|mut p| {
                p.meta_product_id = Some("ipx-555".to_string());
                p
            })
            .collect();

        let plan = plan(&posts);
        assert_eq!(plan.groups.len(), 1);
        let group = &plan.groups[0];
        assert_eq!(group.keep.post_id, 9);
        let mut deleted: Vec<i64> = group.delete.iter().map(|r| r.post_id).collect();
        deleted.sort();
        assert_eq!(deleted, vec![5, 7]);
    }

    #[test]
    fn oldest_survives_among_equal_statuses() {
        let mut a = post(3, "draft", "x-ipx-777", Some("2026-01-01T00:00:00"));
        let mut b = post(4, "draft", "y-ipx-777", Some("2026-02-01T00:00:00"));
        a.meta_product_id = Some("ipx-777".to_string());
        b.meta_product_id = Some("ipx-777".to_string());

        let plan = plan(&[b, a]);
        assert_eq!(plan.groups[0].keep.post_id, 3);
        assert_eq!(plan.groups[0].delete[0].post_id, 4);
    }

    #[test]
    fn trash_ranks_below_unrecognized_statuses() {
        let statuses = ["trash", "draft", "publish"];
        for perm in 0..statuses.len() {
            let rotated: Vec<_> = statuses
                .iter()
                .cycle()
                .skip(perm)
                .take(statuses.len())
                .enumerate()
                .map(|(i, s)| {
                    let mut p = post(i as i64 + 1, *s, "p", None);
                    p.meta_product_id = Some("abc-123".to_string());
                    p
                })
                .collect();

            let plan = plan(&rotated);
            assert_eq!(plan.groups[0].keep.status, "publish");
        }
        assert!(status_rank("trash") > status_rank("weird-custom-status"));
    }

    #[test]
    fn missing_dates_sort_last_then_id_breaks_ties() {
        let mut a = post(12, "draft", "p", None);
        let mut b = post(11, "draft", "p", None);
        let mut c = post(13, "draft", "p", Some("2026-01-01T00:00:00"));
        for p in [&mut a, &mut b, &mut c] {
            p.meta_product_id = Some("abc-123".to_string());
        }

        let plan = plan(&[a, b, c]);
        let group = &plan.groups[0];
        // Dated record wins; among undated records the smaller id sorts first.
        assert_eq!(group.keep.post_id, 13);
        assert_eq!(group.delete[0].post_id, 11);
        assert_eq!(group.delete[1].post_id, 12);
    }

    #[test]
    fn unresolved_records_are_counted_not_grouped() {
        let posts = vec![
            post(1, "publish", "about-us", None),
            post(2, "publish", "contact", None),
            post(3, "publish", "review-ipx-100", None),
        ];

        let plan = plan(&posts);
        assert_eq!(plan.fetched, 3);
        assert_eq!(plan.skipped_no_id, 2);
        assert!(plan.groups.is_empty());
    }

    #[test]
    fn singleton_groups_are_not_reported() {
        let posts = vec![
            post(1, "publish", "a-ipx-100", None),
            post(2, "publish", "b-mide-200", None),
        ];

        let plan = plan(&posts);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.delete_count(), 0);
    }

    #[test]
    fn groups_are_ordered_by_product_id() {
        let mut posts = Vec::new();
        for (id, key) in [(1, "zzz-900"), (2, "zzz-900"), (3, "aaa-100"), (4, "aaa-100")] {
            let mut p = post(id, "draft", "p", None);
            p.meta_product_id = Some(key.to_string());
            posts.push(p);
        }

        let plan = plan(&posts);
        let ids: Vec<_> = plan.groups.iter().map(|g| g.product_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa-100", "zzz-900"]);
    }
}
