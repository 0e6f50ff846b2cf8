//! Read-only consistency check of a firmware file against a profile.

use std::fmt;

use crate::patch::{content_digest, file_checksum_layout};
use crate::profile::FirmwareProfile;
use crate::region::{locate_rom, read_checksum, rom_checksum};
use crate::{PatchError, checksum};

/// A stored checksum next to the value recomputed from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumCheck {
    /// Offset of the stored field.
    pub offset: usize,
    pub stored: u32,
    pub computed: u32,
}

impl ChecksumCheck {
    pub fn matches(&self) -> bool {
        self.stored == self.computed
    }
}

impl fmt::Display for ChecksumCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stored {:08X}, computed {:08X} at {:#x} ({})",
            self.stored,
            self.computed,
            self.offset,
            if self.matches() { "ok" } else { "MISMATCH" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub profile: String,
    /// The file is byte-identical to the profile's reference image.
    pub reference_matches: bool,
    pub rom: ChecksumCheck,
    pub file: ChecksumCheck,
}

impl VerifyReport {
    /// Both checksums agree with the file contents.
    pub fn is_valid(&self) -> bool {
        self.rom.matches() && self.file.matches()
    }
}

/// Recompute both checksums of `firmware` and compare them with the stored ones.
pub fn verify_firmware(
    firmware: &[u8],
    profile: &FirmwareProfile,
) -> Result<VerifyReport, PatchError> {
    profile.validate()?;

    let reference_matches = content_digest(firmware) == profile.reference_md5;

    let located = locate_rom(firmware, profile)?;
    let rom_offset = located
        .shifted(profile.rom_checksum.offset, profile)
        .ok_or(PatchError::RegionTooShort {
            what: "ROM checksum field",
            needed: profile.rom_checksum.offset,
            actual: firmware.len(),
        })?;
    let rom = ChecksumCheck {
        offset: rom_offset,
        stored: read_checksum(firmware, rom_offset, profile.rom_checksum.repr)?,
        computed: rom_checksum(&located.rom, &profile.rom_checksum)?,
    };

    let (covered, stored_at) = file_checksum_layout(firmware, &profile.file_checksum)?;
    let file = ChecksumCheck {
        offset: stored_at,
        stored: read_checksum(firmware, stored_at, profile.file_checksum.repr)?,
        computed: checksum::adler32_prefix(firmware, covered),
    };

    tracing::debug!("ROM checksum {}", rom);
    tracing::debug!("File checksum {}", file);

    Ok(VerifyReport {
        profile: profile.name.clone(),
        reference_matches,
        rom,
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_check_display() {
        let check = ChecksumCheck {
            offset: 0x10,
            stored: 0x1234,
            computed: 0x1234,
        };
        assert!(check.matches());
        assert_eq!(check.to_string(), "stored 00001234, computed 00001234 at 0x10 (ok)");

        let check = ChecksumCheck {
            computed: 0x1235,
            ..check
        };
        assert!(!check.matches());
        assert!(check.to_string().ends_with("(MISMATCH)"));
    }

    #[test]
    fn test_verify_short_file() {
        let profile = FirmwareProfile::imac_slot_loading();
        assert!(matches!(
            verify_firmware(&[0u8; 64], &profile),
            Err(PatchError::RegionTooShort { .. })
        ));
    }
}
