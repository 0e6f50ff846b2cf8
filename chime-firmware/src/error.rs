//! Error type for the patch engine

use std::path::PathBuf;

use crate::ascii85::Ascii85Error;

/// Everything that can stop a patch (or a verification) from completing.
///
/// None of these are recoverable inside the engine: the first one raised
/// aborts the whole operation and no partial firmware is produced.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Unable to read {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to write {}: {source}", path.display())]
    UnwritableOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Firmware is not the original {profile} image (MD5 {actual}, expected {expected})"
    )]
    HashMismatch {
        profile: String,
        expected: String,
        actual: String,
    },

    #[error("Firmware is shorter than expected: {what} needs {needed} bytes, have {actual}")]
    RegionTooShort {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("ROM region is {len} bytes, more than the {max} bytes covered by its checksum")]
    RegionTooLong { len: usize, max: usize },

    #[error("Invalid Ascii85 in ROM line at firmware offset {offset:#x}: {source}")]
    TextCodecDecodeError {
        offset: usize,
        #[source]
        source: Ascii85Error,
    },

    #[error("Sound is too long: {len} bytes (maximum {max} bytes)")]
    SoundTooLong { len: usize, max: usize },

    #[error("Sound does not appear to be 16-bit audio: {len} bytes is not a whole number of samples")]
    SoundMisaligned { len: usize },

    #[error("Sound could not be compressed properly: {actual} bytes, expected {expected}")]
    CompressedLengthMismatch { expected: usize, actual: usize },

    #[error("Checksum field encoded to {actual} bytes, expected {expected}")]
    ChecksumWidthMismatch { expected: usize, actual: usize },

    #[error("File checksum would cover its own field: coverage ends at {covered:#x}, field at {field:#x}")]
    ChecksumCoversField { covered: usize, field: usize },

    #[error("Stored checksum at offset {offset:#x} is not valid: {stored:?}")]
    MalformedStoredChecksum { offset: usize, stored: String },

    #[error("Unknown firmware profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid firmware profile {name}: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("Failed to parse profile file: {0}")]
    ProfileSyntax(#[from] toml::de::Error),
}
