//! Destination key construction.
//!
//! The key is built from three configured strings: bucket, path prefix and
//! base name. Separators in the prefix are normalized, so `/utils/`,
//! `utils/` and `utils` all place the object under `utils/`. The base name
//! never depends on the release being published; every run overwrites the
//! same object.

use std::fmt;
use thiserror::Error;

/// Suffix appended to every archive base name.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Errors constructing a destination key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A required component was empty
    #[error("{component} must not be empty")]
    EmptyComponent {
        /// Component name ("bucket" or "name")
        component: &'static str,
    },

    /// A component contained a value that cannot be part of a key
    #[error("invalid {component} '{value}': {reason}")]
    InvalidComponent {
        /// Component name
        component: &'static str,
        /// Offending value
        value: String,
        /// Reason for the error
        reason: &'static str,
    },
}

/// Fully resolved location of the published archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    bucket: String,
    object_key: String,
}

impl DestinationKey {
    /// Bucket holding the object
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key within the bucket (no leading separator)
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// `s3://bucket/key` form
    pub fn uri(&self) -> String {
        format!("s3://{self}")
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object_key)
    }
}

/// Check an archive base name, returning it trimmed.
///
/// The name becomes a single file name, locally and in the bucket, so it must
/// be non-empty and free of path separators.
pub fn validate_base_name(base_name: &str) -> Result<&str, KeyError> {
    let base_name = base_name.trim();
    if base_name.is_empty() {
        return Err(KeyError::EmptyComponent { component: "name" });
    }
    if base_name.contains(['/', '\\']) {
        return Err(KeyError::InvalidComponent {
            component: "name",
            value: base_name.to_string(),
            reason: "use the prefix for directories",
        });
    }
    Ok(base_name)
}

/// Build the destination key for `bucket`, `prefix` and `base_name`.
///
/// Pure: equal inputs always yield an equal key. Rejects an empty bucket or
/// base name, either of them containing `/`, and `.`/`..` prefix segments.
/// An empty prefix places the archive at the bucket root.
///
/// ```
/// use release_packager::destination::compute_destination_key;
///
/// let key = compute_destination_key("rel-bucket", "/utils/", "config_scripts").unwrap();
/// assert_eq!(key.to_string(), "rel-bucket/utils/config_scripts.zip");
/// assert_eq!(key.object_key(), "utils/config_scripts.zip");
/// ```
pub fn compute_destination_key(
    bucket: &str,
    prefix: &str,
    base_name: &str,
) -> Result<DestinationKey, KeyError> {
    let bucket = bucket.trim();

    if bucket.is_empty() {
        return Err(KeyError::EmptyComponent { component: "bucket" });
    }
    if bucket.contains('/') {
        return Err(KeyError::InvalidComponent {
            component: "bucket",
            value: bucket.to_string(),
            reason: "bucket names cannot contain '/'",
        });
    }
    let base_name = validate_base_name(base_name)?;

    let mut segments = Vec::new();
    for segment in prefix.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(KeyError::InvalidComponent {
                component: "prefix",
                value: prefix.to_string(),
                reason: "relative segments are not allowed",
            });
        }
        segments.push(segment);
    }

    let file_name = if base_name.ends_with(ARCHIVE_SUFFIX) {
        base_name.to_string()
    } else {
        format!("{base_name}{ARCHIVE_SUFFIX}")
    };
    segments.push(&file_name);

    Ok(DestinationKey {
        bucket: bucket.to_string(),
        object_key: segments.join("/"),
    })
}
