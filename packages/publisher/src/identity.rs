//! Canonical product identifier resolution.
//!
//! A remote record can carry its product id in three places, in decreasing
//! order of trust:
//!
//! 1. the structured metadata field written by this publisher;
//! 2. the tail of the slug (`word[-word]*-digits`, 2-10 trailing digits);
//! 3. an affiliate-link `cid=` query parameter somewhere in the rendered
//!    body. Main-site posts sometimes carry the id nowhere else, so this
//!    fallback matters in practice.
//!
//! All hits are lower-cased so downstream comparison is plain string
//! equality. `None` means the record is unresolved; callers exclude it
//! from duplicate grouping and count it separately.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::RemotePost;

static SLUG_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9a-z_]+(?:-[0-9a-z_]+)*-\d{2,10})$").expect("valid slug regex")
});

static BODY_ID_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)cid=([A-Za-z0-9_\-]+)").expect("valid cid regex"),
        Regex::new(r"(?i)cid%3d([A-Za-z0-9_\-]+)").expect("valid encoded cid regex"),
        Regex::new(r"(?i)content_id=([A-Za-z0-9_\-]+)").expect("valid content_id regex"),
    ]
});

/// Resolve the canonical product id for a remote record, trying sources
/// in decreasing trust order and returning the first hit.
pub fn resolve(post: &RemotePost) -> Option<String> {
    if let Some(meta) = post.meta_product_id.as_deref() {
        if !meta.is_empty() {
            return Some(meta.to_lowercase());
        }
    }

    from_slug(&post.slug).or_else(|| from_body(&post.body))
}

/// Extract a product id from the tail of a slug
/// (e.g. `actress-ipx-123` -> `actress-ipx-123`, `about-us` -> none).
pub fn from_slug(slug: &str) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    SLUG_ID_RE
        .captures(slug)
        .map(|c| c[1].to_lowercase())
}

/// Extract a product id from an affiliate URL in rendered body text.
pub fn from_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    // Rendered HTML mixes entity escaping and percent encoding, so
    // normalize before matching.
    let normalized = normalize_body(body);
    BODY_ID_RES
        .iter()
        .find_map(|re| re.captures(&normalized))
        .map(|c| c[1].to_lowercase())
}

fn normalize_body(body: &str) -> String {
    let unescaped = body
        .replace("&amp;", "&")
        .replace("&#038;", "&")
        .replace("&quot;", "\"");
    match urlencoding::decode(&unescaped) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => unescaped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(meta: Option<&str>, slug: &str, body: &str) -> RemotePost {
        RemotePost {
            id: 1,
            status: "publish".to_string(),
            date_gmt: None,
            link: String::new(),
            slug: slug.to_string(),
            meta_product_id: meta.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn meta_field_wins_over_slug_and_body() {
        let p = post(Some("IPX-001"), "review-abc-999", "cid=xyz-555");
        assert_eq!(resolve(&p).as_deref(), Some("ipx-001"));
    }

    #[test]
    fn empty_meta_falls_through_to_slug() {
        let p = post(Some(""), "review-ipx-123", "");
        assert_eq!(resolve(&p).as_deref(), Some("review-ipx-123"));
    }

    #[test]
    fn slug_requires_trailing_digits() {
        assert_eq!(from_slug("review-ipx-123").as_deref(), Some("review-ipx-123"));
        assert_eq!(from_slug("IPX-456").as_deref(), Some("ipx-456"));
        assert!(from_slug("about-us").is_none());
        assert!(from_slug("post-1").is_none()); // only one trailing digit
        assert!(from_slug("").is_none());
    }

    #[test]
    fn body_cid_extraction_handles_escaping() {
        let body = r#"<a href="https://affiliate.example/?lurl=x&amp;cid=ipx-555">buy</a>"#;
        assert_eq!(from_body(body).as_deref(), Some("ipx-555"));

        let encoded = "https://affiliate.example/?redirect=foo%3Fcid%3Dmide-777";
        assert_eq!(from_body(encoded).as_deref(), Some("mide-777"));

        let content_id = "…/detail/?content_id=SSIS-001";
        assert_eq!(from_body(content_id).as_deref(), Some("ssis-001"));
    }

    #[test]
    fn unresolved_record_returns_none() {
        let p = post(None, "hello-world", "<p>no links here</p>");
        assert!(resolve(&p).is_none());
    }
}
