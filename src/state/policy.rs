//! Which files may be sent to the processing service.

use crate::error::ValidationError;

/// Upload ceiling used when the settings don't say otherwise (10 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Image types accepted by default
pub const DEFAULT_ACCEPTED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Accepted media types plus the size ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    accepted_types: Vec<String>,
    max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            DEFAULT_MAX_UPLOAD_BYTES,
        )
    }
}

impl UploadPolicy {
    pub fn new(accepted_types: Vec<String>, max_bytes: u64) -> Self {
        let accepted_types = accepted_types
            .into_iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            accepted_types,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether a declared media type is allowed.
    ///
    /// `image/*` in the list accepts every image type.
    pub fn accepts_type(&self, media_type: &str) -> bool {
        let media_type = media_type.to_ascii_lowercase();

        self.accepted_types.iter().any(|accepted| {
            match accepted.strip_suffix("/*") {
                Some(prefix) => media_type
                    .split_once('/')
                    .map(|(top, _)| top == prefix)
                    .unwrap_or(false),
                None => *accepted == media_type,
            }
        })
    }

    /// Check type first, then size.
    pub fn check(&self, media_type: &str, size: u64) -> Result<(), ValidationError> {
        if !self.accepts_type(media_type) {
            return Err(ValidationError::UnsupportedType {
                media_type: media_type.to_string(),
            });
        }

        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(())
    }
}
