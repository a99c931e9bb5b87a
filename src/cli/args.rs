//! Command line argument parsing and validation.
//!
//! Every setting can come from a flag or from the environment, so the same
//! binary runs unchanged from a CI workflow (variables) or a terminal (flags).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Zip a release tree and publish it to a fixed S3 key
#[derive(Parser, Debug)]
#[command(
    name = "release_packager",
    version,
    about = "Zip a release tree and publish it to a fixed S3 key",
    long_about = "Package the checked-out release tree into a zip archive and upload it
to bucket/prefix/name.zip using short-lived role credentials.

Usage:
  release_packager publish --bucket rel-bucket --prefix /utils/ --name config_scripts \\
      --account-id 123456789012 --region us-east-1 --role-name release-uploader
  release_packager publish --dry-run --bucket rel-bucket --name config_scripts
  release_packager package --output dist
  release_packager key --bucket rel-bucket --prefix /utils/ --name config_scripts"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Source tree options
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory to archive
    #[arg(short, long, env = "PACKAGER_SOURCE", default_value = ".")]
    pub source: PathBuf,
}

/// Destination key options
#[derive(clap::Args, Debug, Clone)]
pub struct DestinationArgs {
    /// Destination bucket
    #[arg(long, env = "PACKAGER_BUCKET")]
    pub bucket: String,

    /// Path prefix inside the bucket
    #[arg(long, env = "PACKAGER_PREFIX", default_value = "")]
    pub prefix: String,

    /// Archive base name (defaults to the source directory's name)
    #[arg(long, env = "PACKAGER_NAME")]
    pub name: Option<String>,
}

/// Role assumption options
#[derive(clap::Args, Debug, Clone)]
pub struct RoleArgs {
    /// Account owning the role
    #[arg(long, env = "PACKAGER_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Region for STS and the bucket
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Role to assume (name or full ARN)
    #[arg(long, env = "PACKAGER_ROLE_NAME")]
    pub role_name: Option<String>,

    /// Session name recorded by STS
    #[arg(long, default_value = crate::config::DEFAULT_SESSION_NAME)]
    pub session_name: String,

    /// Requested session lifetime in seconds
    #[arg(long)]
    pub session_duration: Option<u32>,

    /// Where credentials come from
    #[arg(long, value_enum, default_value_t = CredentialMode::Auto)]
    pub credentials: CredentialMode,
}

/// Credential source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CredentialMode {
    /// CI identity token when available, otherwise static environment credentials
    Auto,
    /// Exchange the CI identity token through STS
    WebIdentity,
    /// Use AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY as given
    Static,
}

/// Options of the `publish` command
#[derive(clap::Args, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    #[command(flatten)]
    pub role: RoleArgs,

    /// Build the archive and stop before authenticating
    #[arg(long)]
    pub dry_run: bool,

    /// Write the final pipeline state as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Keep the archive in this directory instead of a temporary one
    #[arg(long, value_name = "DIR")]
    pub keep_archive: Option<PathBuf>,

    /// Retries for transient upload failures (default: PACKAGER_PUBLISH_RETRIES or 0)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Custom S3 endpoint (S3-compatible stores)
    #[arg(long, env = "PACKAGER_S3_ENDPOINT")]
    pub endpoint: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Archive the source tree and upload it
    Publish(PublishArgs),

    /// Archive the source tree into a local directory
    Package {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Archive base name (defaults to the source directory's name)
        #[arg(long, env = "PACKAGER_NAME")]
        name: Option<String>,
    },

    /// Print the destination key
    Key {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        destination: DestinationArgs,

        /// Print as an s3:// URI
        #[arg(long)]
        uri: bool,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Publish(_) => "publish",
            Command::Package { .. } => "package",
            Command::Key { .. } => "key",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Publish(publish) = &self.command
            && !publish.dry_run
        {
            let role = &publish.role;
            let missing: Vec<&str> = [
                ("--region", role.region.is_none()),
                (
                    "--account-id",
                    role.account_id.is_none() && role.credentials != CredentialMode::Static,
                ),
                (
                    "--role-name",
                    role.role_name.is_none() && role.credentials != CredentialMode::Static,
                ),
            ]
            .into_iter()
            .filter_map(|(flag, missing)| missing.then_some(flag))
            .collect();

            if !missing.is_empty() {
                return Err(format!("publish requires {}", missing.join(", ")));
            }
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print progress message
    pub fn progress_println(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish() {
        let args = Args::try_parse_from([
            "release_packager",
            "publish",
            "--bucket",
            "rel-bucket",
            "--prefix",
            "/utils/",
            "--name",
            "config_scripts",
            "--account-id",
            "123456789012",
            "--region",
            "us-east-1",
            "--role-name",
            "uploader",
        ])
        .unwrap();
        assert!(args.validate().is_ok());
        let Command::Publish(publish) = &args.command else {
            panic!("expected publish");
        };
        assert_eq!(publish.destination.prefix, "/utils/");
        assert_eq!(publish.role.credentials, CredentialMode::Auto);
        assert!(!publish.dry_run);
    }

    #[test]
    fn test_publish_requires_role_unless_dry_run() {
        let args = Args::try_parse_from([
            "release_packager",
            "publish",
            "--bucket",
            "b",
            "--region",
            "us-east-1",
        ])
        .unwrap();
        let err = args.validate().unwrap_err();
        assert!(err.contains("--account-id"));
        assert!(err.contains("--role-name"));

        let dry = Args::try_parse_from(["release_packager", "publish", "--bucket", "b", "--dry-run"])
            .unwrap();
        assert!(dry.validate().is_ok());
    }

    #[test]
    fn test_static_mode_needs_only_region() {
        let args = Args::try_parse_from([
            "release_packager",
            "publish",
            "--bucket",
            "b",
            "--region",
            "us-east-1",
            "--credentials",
            "static",
        ])
        .unwrap();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Args::try_parse_from(["release_packager", "-v", "-q", "key", "--bucket", "b"]);
        assert!(result.is_err());
    }
}
