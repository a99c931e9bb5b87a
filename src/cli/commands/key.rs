//! `key` command: print the destination key.

use super::resolve_base_name;
use crate::cli::{DestinationArgs, RuntimeConfig};
use crate::destination::compute_destination_key;
use crate::error::Result;
use std::path::Path;

pub(super) fn execute_key(
    source: &Path,
    destination: &DestinationArgs,
    uri: bool,
    config: &RuntimeConfig,
) -> Result<i32> {
    let base_name = resolve_base_name(destination.name.as_deref(), source);
    let key = compute_destination_key(&destination.bucket, &destination.prefix, &base_name)?;

    let rendered = if uri { key.uri() } else { key.to_string() };
    config.output().result(&rendered)?;
    Ok(0)
}
