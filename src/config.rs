//! Packager configuration.
//!
//! Everything a run needs is carried in [`PackagerConfig`]; the library
//! never reads ambient process state. The CLI fills the structure from
//! flags and environment variables.

use crate::credentials::RoleSpec;
use crate::destination::{ARCHIVE_SUFFIX, DestinationKey, KeyError, compute_destination_key};
use crate::publish::RetryPolicy;
use std::path::{Path, PathBuf};

/// Session name used for the assumed role when none is configured
pub const DEFAULT_SESSION_NAME: &str = "release-packager";

/// Configuration for one packaging run
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Tree to archive
    pub source_dir: PathBuf,
    /// Destination bucket
    pub bucket: String,
    /// Path prefix inside the bucket
    pub prefix: String,
    /// Archive base name (without `.zip`)
    pub base_name: String,
    /// Account owning the role
    pub account_id: String,
    /// Region for STS and the bucket
    pub region: String,
    /// Role to assume
    pub role_name: String,
    /// Session name recorded by STS
    pub session_name: String,
    /// Requested session lifetime in seconds
    pub session_duration: Option<u32>,
    /// Keep the archive in this directory instead of a temporary one
    pub output_dir: Option<PathBuf>,
    /// Build the archive and stop before authenticating
    pub dry_run: bool,
    /// Retry policy wrapped around the upload
    pub retry: RetryPolicy,
}

impl PackagerConfig {
    /// Create a configuration with defaults for the optional settings
    pub fn new(
        source_dir: impl Into<PathBuf>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        base_name: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            base_name: base_name.into(),
            account_id: String::new(),
            region: String::new(),
            role_name: String::new(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_duration: None,
            output_dir: None,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the role to assume
    pub fn with_role(
        mut self,
        account_id: impl Into<String>,
        role_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        self.account_id = account_id.into();
        self.role_name = role_name.into();
        self.region = region.into();
        self
    }

    /// Destination key for this configuration
    pub fn destination_key(&self) -> Result<DestinationKey, KeyError> {
        compute_destination_key(&self.bucket, &self.prefix, &self.base_name)
    }

    /// File name of the local archive
    pub fn archive_file_name(&self) -> String {
        let name = self.base_name.trim();
        if name.ends_with(ARCHIVE_SUFFIX) {
            name.to_string()
        } else {
            format!("{name}{ARCHIVE_SUFFIX}")
        }
    }

    /// Role session to request
    pub fn role(&self) -> RoleSpec {
        RoleSpec {
            account_id: self.account_id.clone(),
            role_name: self.role_name.clone(),
            session_name: self.session_name.clone(),
            duration_seconds: self.session_duration,
        }
    }
}

/// Base name derived from the source directory's own name.
///
/// Used when no explicit name is configured. Falls back to `release` for
/// paths without a final component (e.g. `/`).
pub fn default_base_name(source_dir: &Path) -> String {
    let resolved = std::fs::canonicalize(source_dir).unwrap_or_else(|_| source_dir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "release".to_string())
}
