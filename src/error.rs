//! Error types for release packaging operations.
//!
//! Every failure surfaces immediately to the caller. The top-level
//! [`PackagerError`] carries actionable recovery suggestions for the CLI.

use std::path::PathBuf;
use thiserror::Error;

pub use crate::archive::ArchiveError;
pub use crate::credentials::CredentialError;
pub use crate::destination::KeyError;
pub use crate::publish::PublishError;

/// Result type alias for release_packager operations
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Main error type for all release_packager operations
#[derive(Error, Debug)]
pub enum PackagerError {
    /// Archive building errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Destination key errors
    #[error("Destination error: {0}")]
    Destination(#[from] KeyError),

    /// Credential acquisition errors
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Upload errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Pipeline state errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pipeline state machine errors
#[derive(Error, Debug)]
pub enum StateError {
    /// A phase was entered out of order
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the pipeline was in
        from: String,
        /// Phase that was requested
        to: String,
    },

    /// The pipeline already reached a terminal phase
    #[error("Pipeline already finished in phase {phase}")]
    AlreadyTerminal {
        /// Terminal phase
        phase: String,
    },

    /// Failed to write the run report
    #[error("Failed to write run report to {path}: {reason}")]
    ReportFailed {
        /// Report path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl PackagerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PackagerError::Archive(ArchiveError::EmptyInput { path }) => vec![
                format!("Nothing to package under {}", path.display()),
                "Run from the checked-out release tree or pass --source".to_string(),
            ],
            PackagerError::Archive(ArchiveError::NotADirectory { path }) => vec![format!(
                "Point --source at a directory, not {}",
                path.display()
            )],
            PackagerError::Destination(_) => vec![
                "Check the bucket, prefix and name settings".to_string(),
                "Bucket and name must be non-empty and must not contain '/'".to_string(),
            ],
            PackagerError::Credentials(CredentialError::MissingIdentityToken) => vec![
                "Grant the workflow `id-token: write` permission".to_string(),
                "Or set AWS_WEB_IDENTITY_TOKEN_FILE to a token file".to_string(),
                "Or use --credentials static with AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                    .to_string(),
            ],
            PackagerError::Credentials(CredentialError::AssumeRoleRejected { .. }) => vec![
                "Verify the role trust policy allows this repository's identity token"
                    .to_string(),
                "Verify the account id and role name".to_string(),
            ],
            PackagerError::Publish(PublishError::AuthExpired { .. }) => vec![
                "Re-run the job to obtain a fresh role session".to_string(),
                "Increase the session duration if uploads are slow".to_string(),
            ],
            PackagerError::Publish(PublishError::PermissionDenied { key, .. }) => vec![format!(
                "Grant s3:PutObject on {key} to the assumed role"
            )],
            PackagerError::Publish(PublishError::Transport { .. }) => vec![
                "Check network connectivity to the object store".to_string(),
                "Set PACKAGER_PUBLISH_RETRIES to retry transient failures".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable by retrying the same operation
    pub fn is_recoverable(&self) -> bool {
        match self {
            PackagerError::Publish(e) => e.is_retryable(),
            PackagerError::Credentials(CredentialError::Transport { .. }) => true,
            _ => false,
        }
    }
}
