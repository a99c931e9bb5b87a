//! # Release Packager
//!
//! Package a checked-out release tree into a zip archive and publish it to a
//! fixed, version-agnostic object-store key using short-lived role credentials.
//!
//! A run is a straight line:
//!
//! 1. compute the destination key (`bucket/prefix/name.zip`)
//! 2. archive the source tree deterministically
//! 3. assume the upload role through a [`CredentialProvider`]
//! 4. upload the archive, overwriting whatever the key held before
//!
//! The first failure ends the run with a non-zero exit status.
//!
//! ## Usage
//!
//! ```bash
//! release_packager publish --bucket rel-bucket --prefix /utils/ --name config_scripts \
//!     --account-id 123456789012 --region us-east-1 --role-name release-uploader
//! release_packager publish --dry-run --bucket rel-bucket --name config_scripts
//! release_packager key --bucket rel-bucket --prefix /utils/ --name config_scripts
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod destination;
pub mod error;
pub mod pipeline;
pub mod publish;

pub use archive::{ArchiveBuilder, ArchiveHandle, build_archive};
pub use cli::Args;
pub use config::PackagerConfig;
pub use credentials::{CredentialProvider, Credentials};
pub use destination::{DestinationKey, compute_destination_key};
pub use error::{PackagerError, Result};
pub use pipeline::{Pipeline, PipelineState, RunSummary};
pub use publish::{PublishResult, Publisher};
