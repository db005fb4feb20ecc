//! Incremental, crash-safe file output.
//!
//! Every output file of a pipeline goes through [`write_if_changed`]. The
//! function has two jobs:
//!
//! - **Skip unchanged outputs.** The destination is read back and compared
//!   byte-for-byte with the new content. When they match nothing is touched:
//!   size, modification time and inode stay as they were, so downstream
//!   mirrors (rsync, CDN revalidation, compiler caches) see no change.
//! - **Publish atomically.** New content is written to a staging file named
//!   `.foundry-<random>` in the destination's own directory, synced to disk,
//!   closed, and renamed over the destination. Readers see either the old
//!   file or the new one, never a prefix. The staging file lives in the same
//!   directory so the rename never crosses a filesystem boundary.
//!
//! The staging file is owned by a [`tempfile::TempPath`]: if anything fails
//! before the rename the path is removed on drop, so no exit path leaves a
//! stray `.foundry-*` file behind.
//!
//! ```text
//! dist/en/
//! ├── .foundry-a8Kq2z   ← staging (write + fsync + close)
//! └── welcome.html      ← rename(staging, welcome.html)
//! ```

use crate::error::{FoundryError, IoContext, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Prefix of staging files created next to each destination.
pub const STAGING_PREFIX: &str = ".foundry-";

/// Mode used for directories created by [`ensure_dir`].
pub const DIR_MODE: u32 = 0o755;

/// Mode given to published files.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// What a write did to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content was published.
    Written,
    /// Destination already held identical bytes; nothing was touched.
    Unchanged,
}

/// Write `content` to `path` unless the file already holds exactly these bytes.
///
/// Parent directories are created as needed (skipped when the parent is empty
/// or `.`). A missing destination is not an error; any other failure to read
/// the existing file is.
pub fn write_if_changed(path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Result<WriteOutcome> {
    let path = path.as_ref();
    let content = content.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FoundryError::invalid("write path is empty"));
    }

    let parent = path.parent().filter(|dir| !is_current_dir(dir));
    if let Some(dir) = parent {
        ensure_dir(dir)?;
    }

    match fs::read(path) {
        Ok(existing) if existing == content => {
            tracing::trace!(path = %path.display(), "unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(FoundryError::io("read existing file", e)),
    }

    publish(parent.unwrap_or(Path::new(".")), path, content)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "published");
    Ok(WriteOutcome::Written)
}

/// Stage `content` inside `dir` and rename it over `path`.
fn publish(dir: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(FILE_MODE));
    }

    let staging = builder.tempfile_in(dir).io_context("create temp file")?;
    let (mut file, staging_path) = staging.into_parts();

    // `staging_path` removes the file on drop until it is persisted.
    file.write_all(content).io_context("write temp file")?;
    file.sync_all().io_context("sync temp file")?;
    drop(file);

    staging_path
        .persist(path)
        .map_err(|e| FoundryError::io("rename temp file", e.error))?;
    Ok(())
}

/// Copy `src` to `dst` through [`write_if_changed`].
///
/// The source is read fully into memory; callers copy small-to-medium static
/// assets, not media libraries.
pub fn copy_file_if_changed(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<WriteOutcome> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if src.as_os_str().is_empty() || dst.as_os_str().is_empty() {
        return Err(FoundryError::invalid("copy paths must be non-empty"));
    }

    let mut file = fs::File::open(src).io_context("open source file")?;
    let meta = file.metadata().io_context("stat source file")?;
    if meta.is_dir() {
        return Err(FoundryError::invalid(format!(
            "source {} is a directory",
            src.display()
        )));
    }

    let mut data = Vec::with_capacity(meta.len() as usize);
    file.read_to_end(&mut data).io_context("read source file")?;
    write_if_changed(dst, data)
}

/// Create `dir` and any missing parents with mode `0755`.
///
/// Existing directories are fine; a non-directory anywhere on the path is an
/// [`FoundryError::Io`].
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Err(FoundryError::invalid("directory path is empty"));
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir).io_context("ensure dir")
}

fn is_current_dir(dir: &Path) -> bool {
    dir.as_os_str().is_empty() || dir == Path::new(".")
}
