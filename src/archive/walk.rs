//! Source tree traversal.
//!
//! Produces the archive entry list in sorted order so the same tree always
//! yields the same archive.

use super::error::{ErrorExt, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Kind of an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory (stored with a trailing `/`)
    Directory,
    /// Symbolic link, stored with its target
    Symlink(PathBuf),
}

/// One entry of the source tree, relative to the source root.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Archive name using `/` separators (directories end with `/`)
    pub name: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Unix permission bits
    pub mode: u32,
}

/// Walk `root` and collect every entry below it.
///
/// Paths in `skip` are left out (the archive being written and the
/// directories created to hold it). Entries that are neither regular files,
/// directories nor symlinks (sockets, FIFOs, devices) are skipped.
pub fn collect_entries(root: &Path, skip: &[PathBuf]) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if skip.iter().any(|s| s == entry.path()) {
            log::debug!("skipping archive output {}", entry.path().display());
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| walk_escape(entry.path()))?;
        let Some(mut name) = archive_name(rel_path) else {
            continue;
        };

        let file_type = entry.file_type();
        let metadata = entry.metadata()?;

        let kind = if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path())
                .fs_context("reading symlink", entry.path())?;
            EntryKind::Symlink(target)
        } else if file_type.is_dir() {
            name.push('/');
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            log::warn!("skipping special file {}", entry.path().display());
            continue;
        };

        entries.push(SourceEntry {
            path: entry.path().to_path_buf(),
            mode: permissions(&metadata, &kind),
            name,
            kind,
        });
    }

    Ok(entries)
}

/// Join the normal components of `rel` with `/`.
fn archive_name(rel: &Path) -> Option<String> {
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn walk_escape(path: &Path) -> super::ArchiveError {
    super::ArchiveError::Io {
        context: "resolving entry outside source root",
        path: path.to_path_buf(),
        error: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path escapes source root"),
    }
}

#[cfg(unix)]
fn permissions(metadata: &std::fs::Metadata, _kind: &EntryKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions(_metadata: &std::fs::Metadata, kind: &EntryKind) -> u32 {
    match kind {
        EntryKind::Directory => 0o755,
        EntryKind::Symlink(_) => 0o777,
        EntryKind::File => 0o644,
    }
}
