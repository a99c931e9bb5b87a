//! Object store connections.
//!
//! A [`StoreConnector`] turns a destination bucket and a set of credentials
//! into an [`ObjectStore`]. The packager only ever calls `put` on it.

use super::PublishError;
use crate::credentials::Credentials;
use crate::destination::DestinationKey;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Builds an authenticated object store handle for a bucket.
pub trait StoreConnector {
    /// Connect to the bucket of `destination` using `credentials`.
    fn connect(
        &self,
        destination: &DestinationKey,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ObjectStore>, PublishError>;
}

/// S3 (or S3-compatible) connector.
#[derive(Debug, Clone)]
pub struct S3Connector {
    region: String,
    endpoint: Option<String>,
}

impl S3Connector {
    /// Connect to AWS S3 in `region`.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
        }
    }

    /// Use a custom endpoint (e.g. `http://localhost:9000` for MinIO).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl StoreConnector for S3Connector {
    fn connect(
        &self,
        destination: &DestinationKey,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ObjectStore>, PublishError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(destination.bucket())
            .with_region(&self.region)
            .with_access_key_id(credentials.access_key_id())
            .with_secret_access_key(credentials.secret_access_key());

        if let Some(token) = credentials.session_token() {
            builder = builder.with_token(token);
        }

        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        let store = builder.build().map_err(|e| PublishError::Store {
            key: destination.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(store))
    }
}

/// Connector backed by in-memory stores, one per bucket.
///
/// Ignores credentials. Used for dry verification and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector {
    buckets: Arc<Mutex<HashMap<String, Arc<InMemory>>>>,
}

impl InMemoryConnector {
    /// Create an empty connector
    pub fn new() -> Self {
        Self::default()
    }

    /// The store backing `bucket`, created on first use
    pub fn bucket(&self, bucket: &str) -> Arc<InMemory> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone()
    }
}

impl StoreConnector for InMemoryConnector {
    fn connect(
        &self,
        destination: &DestinationKey,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn ObjectStore>, PublishError> {
        Ok(self.bucket(destination.bucket()))
    }
}

/// Map an [`object_store::Error`] onto the publish error taxonomy.
///
/// `credentials_expired` reports whether the session had lapsed when the
/// failure was observed.
pub fn classify_store_error(
    err: object_store::Error,
    key: &DestinationKey,
    credentials_expired: bool,
) -> PublishError {
    let key = key.to_string();
    let reason = err.to_string();

    if credentials_expired || mentions_expired_token(&reason) {
        return PublishError::AuthExpired { key };
    }

    match err {
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. } => {
            PublishError::PermissionDenied { key, reason }
        }
        object_store::Error::Generic { .. } if reason.contains("AccessDenied") => {
            PublishError::PermissionDenied { key, reason }
        }
        // Client errors other than throttling are not retried.
        object_store::Error::Generic { .. } => match http_status(&reason) {
            Some(status) if status < 500 && status != 429 => PublishError::Store { key, reason },
            _ => PublishError::Transport { key, reason },
        },
        object_store::Error::JoinError { .. } => PublishError::Transport { key, reason },
        _ => PublishError::Store { key, reason },
    }
}

/// First HTTP status (4xx or 5xx) mentioned after the word "status".
fn http_status(reason: &str) -> Option<u16> {
    reason.match_indices("status").find_map(|(at, word)| {
        let after = &reason[at + word.len()..];
        let start = after
            .char_indices()
            .take(16)
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)?;
        let digits: String = after[start..].chars().take_while(char::is_ascii_digit).collect();
        digits
            .parse::<u16>()
            .ok()
            .filter(|code| (400..600).contains(code))
    })
}

fn mentions_expired_token(reason: &str) -> bool {
    reason.contains("ExpiredToken") || reason.contains("token has expired")
}
