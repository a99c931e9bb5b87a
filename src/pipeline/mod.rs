//! The packaging run.
//!
//! Steps execute strictly in sequence: compute the key, build the archive,
//! assume the role, publish. The first failure ends the run; nothing is
//! retried here except what the configured [`RetryPolicy`](crate::publish::RetryPolicy)
//! allows around the upload.

mod state;

pub use state::{PipelineCheckpoint, PipelineFailure, PipelinePhase, PipelineState};

use crate::archive::ArchiveBuilder;
use crate::config::PackagerConfig;
use crate::credentials::CredentialProvider;
use crate::destination::DestinationKey;
use crate::error::Result;
use crate::publish::{PublishResult, Publisher, StoreConnector};
use serde_json::json;
use std::path::PathBuf;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Destination key
    pub destination: DestinationKey,
    /// Number of archive entries
    pub entries: usize,
    /// Archive size in bytes
    pub archive_size: u64,
    /// Archive SHA-256
    pub archive_sha256: String,
    /// Archive location, when it was kept outside a temporary directory
    pub archive_path: Option<PathBuf>,
    /// Upload outcome; `None` for dry runs
    pub publish: Option<PublishResult>,
}

/// One configured packaging run
pub struct Pipeline<P, C> {
    config: PackagerConfig,
    provider: P,
    publisher: Publisher<C>,
}

impl<P: CredentialProvider, C: StoreConnector> Pipeline<P, C> {
    /// Create a pipeline
    pub fn new(config: PackagerConfig, provider: P, connector: C) -> Self {
        Self {
            config,
            provider,
            publisher: Publisher::new(connector),
        }
    }

    /// The run configuration
    pub fn config(&self) -> &PackagerConfig {
        &self.config
    }

    /// Fresh state for a run of this pipeline
    pub fn new_state(&self) -> PipelineState {
        PipelineState::new(self.config.dry_run)
    }

    /// Execute the run, recording progress in `state`.
    ///
    /// On error `state` ends in [`PipelinePhase::Failed`].
    pub async fn run(&self, state: &mut PipelineState) -> Result<RunSummary> {
        match self.execute(state).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                if !state.current_phase.is_terminal() {
                    state.fail(&e)?;
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<RunSummary> {
        let destination = self.config.destination_key()?;
        state.destination = Some(destination.to_string());
        log::info!("Destination: {}", destination.uri());

        let mut builder = ArchiveBuilder::new(&self.config.source_dir)
            .file_name(self.config.archive_file_name());
        if let Some(dir) = &self.config.output_dir {
            builder = builder.output_dir(dir);
        }
        let archive = builder.build().await?;
        state.advance(
            PipelinePhase::Archived,
            Some(json!({
                "entries": archive.entry_count(),
                "size": archive.size(),
                "sha256": archive.sha256(),
            })),
        )?;

        let mut summary = RunSummary {
            destination,
            entries: archive.entry_count(),
            archive_size: archive.size(),
            archive_sha256: archive.sha256().to_string(),
            archive_path: (!archive.is_temporary()).then(|| archive.path().to_path_buf()),
            publish: None,
        };

        if self.config.dry_run {
            log::info!("Dry run: skipping authentication and upload");
            state.advance(PipelinePhase::Succeeded, Some(json!({ "dry_run": true })))?;
            return Ok(summary);
        }

        let role = self.config.role();
        let credentials = self
            .provider
            .assume_role(&role, &self.config.region)
            .await?;
        state.advance(
            PipelinePhase::Authenticated,
            Some(json!({
                "role": role.arn(),
                "expires_at": credentials.expires_at(),
            })),
        )?;

        let result = self
            .publisher
            .publish_with_retry(&archive, &summary.destination, &credentials, &self.config.retry)
            .await?;
        state.advance(PipelinePhase::Published, Some(serde_json::to_value(&result)?))?;
        state.result = Some(result.clone());
        summary.publish = Some(result);

        state.advance(PipelinePhase::Succeeded, None)?;
        Ok(summary)
    }
}
