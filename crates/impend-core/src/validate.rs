use thiserror::Error;

/// Raster image formats accepted for attachments.
///
/// `image/jpg` is not a registered MIME type but browsers emit it, so it
/// stays on the list.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Attachment size ceiling: 5 MiB.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// What the caller knows about a candidate attachment before any upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl ImageCandidate {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes,
        }
    }
}

/// Rejection reasons checked before any I/O. Never retried; the user has to
/// pick a different file or enter some text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("todo text is empty")]
    EmptyText,
}

/// Check a candidate attachment against the allow-list and size ceiling.
/// Pure, no side effects; must run before any upload attempt.
pub fn validate_image(candidate: &ImageCandidate) -> Result<(), ValidationError> {
    if !ALLOWED_IMAGE_TYPES.contains(&candidate.content_type.as_str()) {
        return Err(ValidationError::UnsupportedType(
            candidate.content_type.clone(),
        ));
    }
    if candidate.size_bytes > MAX_IMAGE_BYTES {
        return Err(ValidationError::TooLarge {
            size: candidate.size_bytes,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}
