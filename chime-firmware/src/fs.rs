//! Whole-file read/write helpers for the CLI and tests.

use std::path::Path;

use crate::PatchError;

/// Maximum firmware file read into memory.
pub const MAX_FIRMWARE_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB
/// Maximum sound file read into memory. Anything near this is rejected as too
/// long by every profile anyway; the cap only bounds the allocation.
pub const MAX_SOUND_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB

/// Read a file into memory with a size cap.
pub fn read_file_with_limit(path: &Path, max_bytes: u64) -> Result<Vec<u8>, PatchError> {
    let unreadable = |source| PatchError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(unreadable)?;
    let len = metadata.len();
    if len > max_bytes {
        return Err(unreadable(std::io::Error::other(format!(
            "file too large ({} bytes, max {} bytes)",
            len, max_bytes
        ))));
    }
    std::fs::read(path).map_err(unreadable)
}

/// Write a complete file, replacing any existing one.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PatchError> {
    std::fs::write(path, bytes).map_err(|source| PatchError::UnwritableOutput {
        path: path.to_path_buf(),
        source,
    })
}
