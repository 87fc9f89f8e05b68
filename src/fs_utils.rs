//! Filesystem utility functions
//!
//! This module provides common filesystem operations used across the codebase.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Permission bits for credential files (owner read/write only)
pub const PRIVATE_FILE_MODE: u32 = 0o600;
/// Permission bits for everything else we write
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Recursively calculate the total size of a directory in bytes
///
/// Symbolic links are not followed. A missing directory counts as empty.
pub fn dir_size(path: &Path) -> io::Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

/// Copy a file byte-for-byte without ever replacing an existing destination
///
/// The destination is opened with `create_new`, so an existing file fails with
/// [`io::ErrorKind::AlreadyExists`] before anything is written. On Unix the new
/// file is created with `mode` (subject to the process umask).
///
/// # Errors
/// Returns the I/O error from reading `src` or creating/writing `dst`.
pub fn copy_file_no_clobber(src: &Path, dst: &Path, mode: u32) -> io::Result<u64> {
    let data = fs::read(src)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(dst)?;
    file.write_all(&data)?;
    file.sync_all()?;
    Ok(data.len() as u64)
}

/// Unix permission bits of a path, if the platform has them
#[cfg(unix)]
pub fn file_mode(path: &Path) -> io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(fs::metadata(path)?.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
pub fn file_mode(path: &Path) -> io::Result<Option<u32>> {
    fs::metadata(path)?;
    Ok(None)
}

/// Format a byte count for display
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
