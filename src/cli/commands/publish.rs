//! `publish` command: archive, authenticate, upload.

use super::resolve_base_name;
use crate::cli::{CredentialMode, PublishArgs, RetryConfig, RuntimeConfig};
use crate::config::PackagerConfig;
use crate::credentials::{
    CredentialError, CredentialProvider, Credentials, IdentityTokenSource, RoleSpec,
    StaticProvider, WebIdentityProvider,
};
use crate::error::{CliError, Result};
use crate::pipeline::{Pipeline, PipelineState};
use crate::publish::S3Connector;

/// Provider chosen for this run from `--credentials` and the environment.
enum RunProvider {
    WebIdentity(WebIdentityProvider),
    Static(StaticProvider),
    Unavailable,
}

impl RunProvider {
    fn select(mode: CredentialMode, dry_run: bool) -> std::result::Result<Self, CredentialError> {
        if dry_run {
            return Ok(Self::Unavailable);
        }
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        match mode {
            CredentialMode::WebIdentity => Ok(IdentityTokenSource::from_env()
                .map(|source| Self::WebIdentity(WebIdentityProvider::new(source)))
                .unwrap_or(Self::Unavailable)),
            CredentialMode::Static => StaticProvider::from_vars(env).map(Self::Static),
            CredentialMode::Auto => {
                if let Some(source) = IdentityTokenSource::from_env() {
                    return Ok(Self::WebIdentity(WebIdentityProvider::new(source)));
                }
                Ok(StaticProvider::from_vars(env)
                    .map(Self::Static)
                    .unwrap_or(Self::Unavailable))
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::WebIdentity(_) => "CI identity token",
            Self::Static(_) => "static environment credentials",
            Self::Unavailable => "none",
        }
    }
}

impl CredentialProvider for RunProvider {
    async fn assume_role(
        &self,
        role: &RoleSpec,
        region: &str,
    ) -> std::result::Result<Credentials, CredentialError> {
        match self {
            Self::WebIdentity(provider) => provider.assume_role(role, region).await,
            Self::Static(provider) => provider.assume_role(role, region).await,
            Self::Unavailable => Err(CredentialError::MissingIdentityToken),
        }
    }
}

fn build_config(args: &PublishArgs) -> Result<PackagerConfig> {
    let source = &args.source.source;
    let base_name = resolve_base_name(args.destination.name.as_deref(), source);
    let retry = RetryConfig::resolve(args.retries)
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let role = &args.role;
    let mut config = PackagerConfig::new(
        source.clone(),
        args.destination.bucket.as_str(),
        args.destination.prefix.as_str(),
        base_name,
    )
    .with_role(
        role.account_id.clone().unwrap_or_default(),
        role.role_name.clone().unwrap_or_default(),
        role.region.clone().unwrap_or_default(),
    );
    config.session_name = role.session_name.clone();
    config.session_duration = role.session_duration;
    config.output_dir = args.keep_archive.clone();
    config.dry_run = args.dry_run;
    config.retry = retry.publish_policy();
    Ok(config)
}

pub(super) async fn execute_publish(args: &PublishArgs, output: &RuntimeConfig) -> Result<i32> {
    let config = build_config(args)?;
    let provider = RunProvider::select(args.role.credentials, args.dry_run)?;

    let mut connector = S3Connector::new(config.region.clone());
    if let Some(endpoint) = &args.endpoint {
        connector = connector.with_endpoint(endpoint.clone());
    }

    output.section("Publishing release archive");
    output.verbose_println(&format!("Source: {}", config.source_dir.display()));
    output.verbose_println(&format!("Credentials: {}", provider.describe()));
    if config.retry.max_retries > 0 {
        output.verbose_println(&format!("Upload retries: {}", config.retry.max_retries));
    }

    let pipeline = Pipeline::new(config, provider, connector);
    let mut state: PipelineState = pipeline.new_state();

    output.progress_println("Building archive...");
    let outcome = pipeline.run(&mut state).await;

    if let Some(report) = &args.report {
        match state.save(report) {
            Ok(()) => output.verbose_println(&format!("Run report written to {}", report.display())),
            Err(e) => output.warning_println(&format!("Could not write run report: {e}")),
        }
    }

    let summary = outcome?;

    output.success_println(&format!(
        "Archived {} entries ({} bytes)",
        summary.entries, summary.archive_size
    ));
    output.indent(&format!("sha256: {}", summary.archive_sha256));
    if let Some(path) = &summary.archive_path {
        output.indent(&format!("archive: {}", path.display()));
    }

    match &summary.publish {
        Some(result) => {
            output.success_println(&format!("Published {}", summary.destination.uri()));
            if let Some(e_tag) = &result.e_tag {
                output.indent(&format!("etag: {e_tag}"));
            }
            if let Some(version) = &result.version {
                output.indent(&format!("version: {version}"));
            }
        }
        None => output.warning_println(&format!(
            "Dry run: {} was not uploaded",
            summary.destination.uri()
        )),
    }

    output.output().result(&summary.destination.to_string())?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};
    use clap::Parser;

    fn publish_args(extra: &[&str]) -> PublishArgs {
        let mut argv = vec!["release_packager", "publish", "--bucket", "rel-bucket"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Publish(args) => args,
            other => panic!("unexpected command {}", other.name()),
        }
    }

    #[test]
    fn test_config_from_args() {
        let args = publish_args(&[
            "--prefix",
            "/utils/",
            "--name",
            "config_scripts",
            "--account-id",
            "123456789012",
            "--role-name",
            "uploader",
            "--region",
            "eu-west-1",
            "--retries",
            "2",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.destination_key().unwrap().to_string(),
            "rel-bucket/utils/config_scripts.zip"
        );
        assert_eq!(config.role().arn(), "arn:aws:iam::123456789012:role/uploader");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_too_many_retries_rejected() {
        let args = publish_args(&["--dry-run", "--name", "n", "--retries", "50"]);
        assert!(build_config(&args).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_has_no_provider() {
        let provider = RunProvider::select(CredentialMode::Auto, true).unwrap();
        assert!(matches!(provider, RunProvider::Unavailable));
        let err = provider
            .assume_role(&RoleSpec::new("1", "r"), "us-east-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingIdentityToken));
    }
}
