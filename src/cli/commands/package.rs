//! `package` command: build the archive without uploading it.

use super::resolve_base_name;
use crate::archive::ArchiveBuilder;
use crate::cli::RuntimeConfig;
use crate::destination::{ARCHIVE_SUFFIX, validate_base_name};
use crate::error::Result;
use std::path::Path;

pub(super) async fn execute_package(
    source: &Path,
    output_dir: &Path,
    name: Option<&str>,
    config: &RuntimeConfig,
) -> Result<i32> {
    let resolved = resolve_base_name(name, source);
    let base_name = validate_base_name(&resolved)?;
    let file_name = if base_name.ends_with(ARCHIVE_SUFFIX) {
        base_name.to_string()
    } else {
        format!("{base_name}{ARCHIVE_SUFFIX}")
    };

    config.progress_println(&format!("Archiving {}", source.display()));
    let _ = config
        .output()
        .info(&format!("Writing {file_name} to {}", output_dir.display()));
    let archive = ArchiveBuilder::new(source)
        .file_name(file_name)
        .output_dir(output_dir)
        .build()
        .await?;

    config.success_println(&format!(
        "Archived {} entries ({} bytes)",
        archive.entry_count(),
        archive.size()
    ));
    config.indent(&format!("sha256: {}", archive.sha256()));
    config.output().result(&archive.path().display().to_string())?;
    Ok(0)
}
