//! Publishing output files by atomic rename.

use std::{fs::File, path::Path};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;

/// Writes through a temporary file in the destination directory and renames
/// it over `file_path` once `write` succeeds. Readers never see a partial
/// file, and an overlapping run replaces the file whole.
pub fn write_atomically<F>(file_path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    tmp.persist(file_path)
        .map_err(|e| anyhow!("Failed to publish {}: {}", file_path.display(), e.error))?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
