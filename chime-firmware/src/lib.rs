//! Startup chime patch engine for iMac firmware update files.
//!
//! The boot ROM inside a firmware update carries the startup chime as IMA 4:1
//! ADPCM. Replacing it means decoding the ROM out of the update file, splicing
//! in a freshly compressed sound, fixing the ROM checksum, re-embedding the
//! ROM and finally fixing the checksum over the whole file. Where each of
//! those lives is described by a [`FirmwareProfile`].
//!
//! ```no_run
//! use chime_firmware::{FirmwareProfile, PatchOptions, patch_firmware};
//!
//! let firmware = std::fs::read("iMacFirmware3.0")?;
//! let sound = std::fs::read("chime.raw")?;
//! let patched = patch_firmware(
//!     firmware,
//!     &sound,
//!     &FirmwareProfile::imac_original(),
//!     &PatchOptions::default(),
//! )?;
//! std::fs::write("iMacFirmware3.0-patched", &patched.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ascii85;
pub mod checksum;
mod error;
pub mod fs;
pub mod patch;
pub mod profile;
pub mod region;
pub mod verify;

pub use error::PatchError;
pub use patch::{PatchOptions, PatchedFirmware, content_digest, patch_firmware};
pub use profile::{FirmwareProfile, builtin_profile, builtin_profiles, load_profile};
pub use verify::{ChecksumCheck, VerifyReport, verify_firmware};
