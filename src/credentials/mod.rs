//! Short-lived credentials for the object store.
//!
//! The packager never authenticates by itself. It asks a [`CredentialProvider`]
//! to assume a role and receives [`Credentials`] that are valid for a limited
//! time. Two providers ship with the crate:
//!
//! - [`WebIdentityProvider`] exchanges the CI run's identity token for a role
//!   session through STS `AssumeRoleWithWebIdentity`.
//! - [`StaticProvider`] hands out credentials supplied up front, for local runs.

mod identity;
mod sts;

pub use identity::{DEFAULT_AUDIENCE, IdentityTokenSource};
pub use sts::{WebIdentityProvider, parse_assume_role_response};

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Errors obtaining credentials
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No identity token source is available in this environment
    #[error("No CI identity token available (set ACTIONS_ID_TOKEN_REQUEST_URL or AWS_WEB_IDENTITY_TOKEN_FILE)")]
    MissingIdentityToken,

    /// The identity token could not be obtained
    #[error("Failed to obtain identity token: {reason}")]
    IdentityToken {
        /// Reason for the error
        reason: String,
    },

    /// STS refused the role assumption
    #[error("Role assumption for {role_arn} rejected ({code}): {message}")]
    AssumeRoleRejected {
        /// Role that was requested
        role_arn: String,
        /// Error code reported by STS
        code: String,
        /// Error message reported by STS
        message: String,
    },

    /// The credential response could not be understood
    #[error("Malformed credential response: {reason}")]
    Malformed {
        /// Reason for the error
        reason: String,
    },

    /// A required static credential variable is missing
    #[error("Missing static credential variable {variable}")]
    MissingStatic {
        /// Variable name
        variable: &'static str,
    },

    /// Network failure talking to the token or STS endpoint
    #[error("Network error obtaining credentials: {reason}")]
    Transport {
        /// Reason for the error
        reason: String,
    },
}

impl From<reqwest::Error> for CredentialError {
    fn from(e: reqwest::Error) -> Self {
        CredentialError::Transport {
            reason: e.to_string(),
        }
    }
}

/// Temporary authorization material for one run.
///
/// Never persisted. `Debug` output redacts the secret and session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Create credentials
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expires_at,
        }
    }

    /// Access key id
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Session token, present for assumed-role sessions
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Expiry instant, `None` for credentials that do not expire
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the credentials are past their validity window at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the credentials are past their validity window
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Role to assume for the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    /// Target account identifier
    pub account_id: String,
    /// Role name, or a full role ARN
    pub role_name: String,
    /// Session name recorded by STS
    pub session_name: String,
    /// Requested session lifetime in seconds
    pub duration_seconds: Option<u32>,
}

impl RoleSpec {
    /// Create a role reference with the default session name
    pub fn new(account_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
            session_name: "release-packager".to_string(),
            duration_seconds: None,
        }
    }

    /// ARN of the role
    pub fn arn(&self) -> String {
        if self.role_name.starts_with("arn:") {
            self.role_name.clone()
        } else {
            format!("arn:aws:iam::{}:role/{}", self.account_id, self.role_name)
        }
    }
}

/// Source of role credentials.
pub trait CredentialProvider {
    /// Assume `role` in `region` and return credentials for it.
    fn assume_role(
        &self,
        role: &RoleSpec,
        region: &str,
    ) -> impl Future<Output = Result<Credentials, CredentialError>> + Send;
}

/// Provider returning fixed credentials, ignoring the requested role.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    credentials: Credentials,
}

impl StaticProvider {
    /// Wrap fixed credentials
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` through `get`.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, CredentialError> {
        let access_key_id = get("AWS_ACCESS_KEY_ID").ok_or(CredentialError::MissingStatic {
            variable: "AWS_ACCESS_KEY_ID",
        })?;
        let secret_access_key =
            get("AWS_SECRET_ACCESS_KEY").ok_or(CredentialError::MissingStatic {
                variable: "AWS_SECRET_ACCESS_KEY",
            })?;
        let session_token = get("AWS_SESSION_TOKEN").filter(|t| !t.is_empty());
        Ok(Self::new(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
        )))
    }
}

impl CredentialProvider for StaticProvider {
    async fn assume_role(
        &self,
        role: &RoleSpec,
        _region: &str,
    ) -> Result<Credentials, CredentialError> {
        log::debug!("Using static credentials in place of {}", role.arn());
        Ok(self.credentials.clone())
    }
}
