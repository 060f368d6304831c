use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::StorageError;

/// Replace `path` with `data` without ever exposing a partial file.
///
/// The bytes land in a temporary file in the same directory, are synced, and the
/// temporary is renamed over the destination.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;

    tracing::trace!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
