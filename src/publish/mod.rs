//! Archive upload.
//!
//! [`Publisher::publish`] writes the archive to its destination key with
//! unconditional overwrite semantics: the last writer wins and no ETag
//! precondition is sent. Exactly one attempt is made; see
//! [`Publisher::publish_with_retry`] for the opt-in retry decorator.

mod retry;
mod store;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use store::{InMemoryConnector, S3Connector, StoreConnector, classify_store_error};

use crate::archive::{ArchiveHandle, sha256_bytes};
use crate::credentials::Credentials;
use crate::destination::DestinationKey;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, PutMode, PutOptions, PutPayload};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Content type recorded on uploaded archives.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Upload errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Credentials expired before or during the upload
    #[error("Credentials expired while publishing {key}")]
    AuthExpired {
        /// Destination key
        key: String,
    },

    /// The assumed role may not write the destination key
    #[error("Permission denied writing {key}: {reason}")]
    PermissionDenied {
        /// Destination key
        key: String,
        /// Reason reported by the store
        reason: String,
    },

    /// Network failure talking to the store
    #[error("Transport error publishing {key}: {reason}")]
    Transport {
        /// Destination key
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// Any other store failure (bad configuration, missing bucket, ...)
    #[error("Object store error publishing {key}: {reason}")]
    Store {
        /// Destination key
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// The local archive could not be read
    #[error("Failed to read archive {path}: {source}")]
    Io {
        /// Archive path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Whether retrying the same upload may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Transport { .. })
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Always `true`; failures are reported as [`PublishError`]
    pub success: bool,
    /// `bucket/key` that was written
    pub remote_key: String,
    /// Uploaded byte count
    pub size: u64,
    /// Lowercase hex SHA-256 of the uploaded bytes
    pub sha256: String,
    /// ETag returned by the store
    pub e_tag: Option<String>,
    /// Object version returned by the store
    pub version: Option<String>,
}

/// Uploads archives through a [`StoreConnector`].
#[derive(Debug, Clone)]
pub struct Publisher<C> {
    connector: C,
}

impl<C: StoreConnector> Publisher<C> {
    /// Create a publisher
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Upload `archive` to `key`, overwriting any existing object.
    ///
    /// Expired credentials are rejected before anything is sent.
    pub async fn publish(
        &self,
        archive: &ArchiveHandle,
        key: &DestinationKey,
        credentials: &Credentials,
    ) -> Result<PublishResult, PublishError> {
        if credentials.is_expired() {
            return Err(PublishError::AuthExpired {
                key: key.to_string(),
            });
        }

        let data = tokio::fs::read(archive.path())
            .await
            .map_err(|source| PublishError::Io {
                path: archive.path().to_path_buf(),
                source,
            })?;

        self.put(Bytes::from(data), archive.sha256().to_string(), key, credentials)
            .await
    }

    /// Upload raw archive bytes to `key`, overwriting any existing object.
    pub async fn publish_bytes(
        &self,
        data: Bytes,
        key: &DestinationKey,
        credentials: &Credentials,
    ) -> Result<PublishResult, PublishError> {
        if credentials.is_expired() {
            return Err(PublishError::AuthExpired {
                key: key.to_string(),
            });
        }
        let sha256 = sha256_bytes(&data);
        self.put(data, sha256, key, credentials).await
    }

    /// [`publish`](Self::publish) wrapped in `policy`.
    pub async fn publish_with_retry(
        &self,
        archive: &ArchiveHandle,
        key: &DestinationKey,
        credentials: &Credentials,
        policy: &RetryPolicy,
    ) -> Result<PublishResult, PublishError> {
        retry_with_backoff(
            || self.publish(archive, key, credentials),
            policy,
            "publish",
        )
        .await
    }

    async fn put(
        &self,
        data: Bytes,
        sha256: String,
        key: &DestinationKey,
        credentials: &Credentials,
    ) -> Result<PublishResult, PublishError> {
        let store = self.connector.connect(key, credentials)?;
        let size = data.len() as u64;

        let mut opts = PutOptions {
            mode: PutMode::Overwrite,
            ..Default::default()
        };
        opts.attributes
            .insert(Attribute::ContentType, ARCHIVE_CONTENT_TYPE.into());
        opts.attributes
            .insert(Attribute::Metadata("sha256".into()), sha256.clone().into());

        log::info!("Uploading {size} bytes to {}", key.uri());
        let path = ObjectPath::from(key.object_key());
        let result = store
            .put_opts(&path, PutPayload::from(data), opts)
            .await
            .map_err(|e| classify_store_error(e, key, credentials.is_expired()))?;

        log::info!("Published {}", key.uri());
        Ok(PublishResult {
            success: true,
            remote_key: key.to_string(),
            size,
            sha256,
            e_tag: result.e_tag,
            version: result.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::compute_destination_key;
    use chrono::{Duration, Utc};
    use object_store::ObjectStore;

    fn fresh() -> Credentials {
        Credentials::new("a", "s", Some("t".into()), Some(Utc::now() + Duration::hours(1)))
    }

    #[tokio::test]
    async fn test_publish_bytes_overwrites() {
        let connector = InMemoryConnector::new();
        let publisher = Publisher::new(connector.clone());
        let key = compute_destination_key("b", "p", "n").unwrap();

        publisher
            .publish_bytes(Bytes::from_static(b"first"), &key, &fresh())
            .await
            .unwrap();
        let result = publisher
            .publish_bytes(Bytes::from_static(b"second"), &key, &fresh())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.remote_key, "b/p/n.zip");
        assert_eq!(result.size, 6);

        let stored = connector
            .bucket("b")
            .get(&ObjectPath::from("p/n.zip"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_expired_credentials_write_nothing() {
        let connector = InMemoryConnector::new();
        let publisher = Publisher::new(connector.clone());
        let key = compute_destination_key("b", "p", "n").unwrap();
        let expired = Credentials::new("a", "s", None, Some(Utc::now() - Duration::seconds(1)));

        let err = publisher
            .publish_bytes(Bytes::from_static(b"data"), &key, &expired)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::AuthExpired { .. }));

        let head = connector.bucket("b").head(&ObjectPath::from("p/n.zip")).await;
        assert!(matches!(head, Err(object_store::Error::NotFound { .. })));
    }

    #[test]
    fn test_only_transport_is_retryable() {
        let key = "b/k.zip".to_string();
        assert!(PublishError::Transport { key: key.clone(), reason: String::new() }.is_retryable());
        assert!(!PublishError::AuthExpired { key: key.clone() }.is_retryable());
        assert!(!PublishError::PermissionDenied { key, reason: String::new() }.is_retryable());
    }
}
