//! AT URI helpers

use crate::constants::POST_COLLECTION;

/// Convert `at://{did}/app.bsky.feed.post/{rkey}` into a bsky.app link.
///
/// Returns `None` for any other scheme, collection, or an incomplete URI.
#[must_use]
pub fn at_uri_to_bsky_app_url(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("at://")?;
    let mut parts = rest.split('/');
    let did = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    let collection = parts.next().map(str::trim)?;
    let rkey = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    if collection != POST_COLLECTION {
        return None;
    }
    Some(format!("https://bsky.app/profile/{did}/post/{rkey}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_post_uri() {
        assert_eq!(
            at_uri_to_bsky_app_url("at://did:plc:abc/app.bsky.feed.post/3kxyz").as_deref(),
            Some("https://bsky.app/profile/did:plc:abc/post/3kxyz")
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(at_uri_to_bsky_app_url("https://bsky.app/x"), None);
        assert_eq!(at_uri_to_bsky_app_url("at://did:plc:abc/app.bsky.feed.like/1"), None);
        assert_eq!(at_uri_to_bsky_app_url("at://did:plc:abc/app.bsky.feed.post"), None);
        assert_eq!(at_uri_to_bsky_app_url("at:///app.bsky.feed.post/1"), None);
    }
}
