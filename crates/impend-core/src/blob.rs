use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::todo::UserId;

/// A stored attachment: the retrievable URL plus the underlying object key.
///
/// The key is what later deletion needs; the URL is what rows reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub key: String,
}

/// The trait all binary object stores implement.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under the key. Returns the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, BlobError>;

    /// Remove the object stored under the key.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Errors from the blob store.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("delete failed: {0}")]
    Delete(String),
}

/// Build a collision-resistant object key scoped under the owner's
/// namespace: `{user}/{millis}-{random}.{ext}`.
///
/// The owner prefix makes objects attributable for later deletion; the
/// time-plus-random file name keeps concurrent uploads from the same user
/// from colliding.
pub fn object_key(user: UserId, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin");
    format!(
        "{}/{}-{}.{}",
        user,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext
    )
}

/// Recover the object key from a public URL by locating the bucket segment
/// in the path and taking everything after it.
pub fn key_from_url(url: &str, bucket: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let bucket_index = segments.iter().position(|s| *s == bucket)?;
    let key_segments = &segments[bucket_index + 1..];
    if key_segments.is_empty() {
        return None;
    }
    Some(key_segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_owner_scoped() {
        let user = Uuid::new_v4();
        let key = object_key(user, "receipt.png");
        assert!(key.starts_with(&format!("{}/", user)));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn object_keys_do_not_collide() {
        let user = Uuid::new_v4();
        let a = object_key(user, "a.jpg");
        let b = object_key(user, "a.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn object_key_without_extension_falls_back() {
        let key = object_key(Uuid::new_v4(), "README");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn key_round_trips_through_url() {
        let user = Uuid::new_v4();
        let key = object_key(user, "photo.webp");
        let url = format!("https://blobs.example.com/storage/v1/my-todo/{}", key);
        assert_eq!(key_from_url(&url, "my-todo").as_deref(), Some(key.as_str()));
    }

    #[test]
    fn key_from_url_rejects_foreign_urls() {
        assert_eq!(key_from_url("not a url", "my-todo"), None);
        assert_eq!(
            key_from_url("https://blobs.example.com/other-bucket/u/f.png", "my-todo"),
            None
        );
        assert_eq!(
            key_from_url("https://blobs.example.com/my-todo", "my-todo"),
            None
        );
    }
}
