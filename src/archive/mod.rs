//! Deterministic release archives.
//!
//! Packages a full directory tree into a single ZIP file. Nothing is
//! excluded: hidden files and build output present at invocation time are
//! archived along with everything else. Entries are written in sorted order
//! with a fixed timestamp, so an unchanged tree always produces the same
//! bytes.
//!
//! ```no_run
//! use release_packager::archive::ArchiveBuilder;
//!
//! # async fn demo() -> Result<(), release_packager::archive::ArchiveError> {
//! let archive = ArchiveBuilder::new(".")
//!     .file_name("config_scripts.zip")
//!     .build()
//!     .await?;
//! println!("{} ({} bytes)", archive.path().display(), archive.size());
//! # Ok(())
//! # }
//! ```

mod checksum;
mod error;
mod walk;

pub use checksum::{sha256_bytes, sha256_file};
pub use error::{ArchiveError, ErrorExt, Result};
pub use walk::{EntryKind, SourceEntry, collect_entries};

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

/// File name used when none is configured.
pub const DEFAULT_ARCHIVE_NAME: &str = "release.zip";

/// A finished archive on local storage.
///
/// When the archive was written to a temporary location, the file is
/// removed when the handle is dropped.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    entries: usize,
    size: u64,
    sha256: String,
    workdir: Option<TempDir>,
}

impl ArchiveHandle {
    /// Location of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries (files, directories and links) in the archive
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Archive size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercase hex SHA-256 of the archive file
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Whether the archive lives in a temporary directory owned by this handle
    pub fn is_temporary(&self) -> bool {
        self.workdir.is_some()
    }
}

/// Builder for release archives.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    source_root: PathBuf,
    file_name: String,
    output_dir: Option<PathBuf>,
}

impl ArchiveBuilder {
    /// Archive the tree rooted at `source_root`.
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            file_name: DEFAULT_ARCHIVE_NAME.to_string(),
            output_dir: None,
        }
    }

    /// Name of the archive file.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Write the archive into `dir` instead of a temporary directory.
    ///
    /// `dir` may lie inside the source tree; the archive never includes itself.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Walk the source tree and write the archive.
    pub async fn build(self) -> Result<ArchiveHandle> {
        let metadata = tokio::fs::metadata(&self.source_root)
            .await
            .fs_context("reading source root", &self.source_root)?;
        if !metadata.is_dir() {
            return Err(ArchiveError::NotADirectory {
                path: self.source_root,
            });
        }
        let root = tokio::fs::canonicalize(&self.source_root)
            .await
            .fs_context("resolving source root", &self.source_root)?;

        // Directories created here for the output are not part of the tree.
        let mut skip = Vec::new();
        let (output_dir, workdir) = match &self.output_dir {
            Some(dir) => {
                let missing = missing_ancestors(dir).await;
                tokio::fs::create_dir_all(dir)
                    .await
                    .fs_context("creating output directory", dir)?;
                for created in &missing {
                    skip.push(
                        tokio::fs::canonicalize(created)
                            .await
                            .fs_context("resolving output directory", created)?,
                    );
                }
                let dir = tokio::fs::canonicalize(dir)
                    .await
                    .fs_context("resolving output directory", dir)?;
                (dir, None)
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("release-packager-")
                    .tempdir()
                    .fs_context("creating temporary directory", std::env::temp_dir())?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };
        let output = output_dir.join(&self.file_name);
        skip.push(output.clone());

        log::info!("Archiving {} into {}", root.display(), output.display());

        let task_output = output.clone();
        let (entries, size, sha256) = tokio::task::spawn_blocking(move || {
            let entries = collect_entries(&root, &skip)?;
            if entries.is_empty() {
                return Err(ArchiveError::EmptyInput { path: root });
            }
            let size = write_zip(&entries, &task_output)?;
            let sha256 = sha256_file(&task_output)?;
            Ok((entries.len(), size, sha256))
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))??;

        log::info!("Archive ready: {entries} entries, {size} bytes, sha256 {sha256}");

        Ok(ArchiveHandle {
            path: output,
            entries,
            size,
            sha256,
            workdir,
        })
    }
}

/// `dir` and those of its ancestors that do not exist yet, deepest first.
async fn missing_ancestors(dir: &Path) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty()
            || tokio::fs::try_exists(ancestor).await.unwrap_or(true)
        {
            break;
        }
        missing.push(ancestor.to_path_buf());
    }
    missing
}

/// Archive `source_root` into a temporary location.
pub async fn build_archive(source_root: impl Into<PathBuf>) -> Result<ArchiveHandle> {
    ArchiveBuilder::new(source_root).build().await
}

/// Write `entries` to a new ZIP file at `output`, returning its size.
fn write_zip(entries: &[SourceEntry], output: &Path) -> Result<u64> {
    let file = File::create(output).fs_context("creating archive", output)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(entry.mode);

        match &entry.kind {
            EntryKind::Directory => {
                zip.add_directory(entry.name.as_str(), options)?;
            }
            EntryKind::Symlink(target) => {
                let target = target.to_string_lossy().replace('\\', "/");
                zip.add_symlink(entry.name.as_str(), target.as_str(), options)?;
            }
            EntryKind::File => {
                let mut source =
                    File::open(&entry.path).fs_context("reading source file", &entry.path)?;
                let large = source
                    .metadata()
                    .fs_context("reading source metadata", &entry.path)?
                    .len()
                    >= u64::from(u32::MAX);
                zip.start_file(entry.name.as_str(), options.large_file(large))?;
                io::copy(&mut source, &mut zip).fs_context("writing archive", output)?;
            }
        }
    }

    let mut writer = zip.finish()?;
    writer.flush().fs_context("flushing archive", output)?;
    drop(writer);

    let size = std::fs::metadata(output)
        .fs_context("reading archive metadata", output)?
        .len();
    Ok(size)
}
