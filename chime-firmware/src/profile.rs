//! Firmware profiles: the layout of one firmware update file.
//!
//! A `FirmwareProfile` is the single source of truth for everything the patch
//! engine needs to know about a firmware variant: where the ROM image lives
//! and how it is stored, where the chime sits inside it, and where and how
//! both checksums are written. The engine never hard-codes a variant.
//!
//! # Example
//!
//! ```
//! use chime_firmware::profile::{builtin_profile, ChecksumRepr};
//!
//! let profile = builtin_profile("imac-slot-loading").unwrap();
//! assert_eq!(profile.sound.blocks, 1722);
//! assert_eq!(profile.rom_checksum.repr, ChecksumRepr::BigEndian);
//! ```
//!
//! Profiles can also be written as TOML:
//!
//! ```toml
//! name = "my-variant"
//! reference_md5 = "00112233445566778899aabbccddeeff"
//!
//! [rom]
//! offset = 4096
//! len = 8192
//! encoding = { kind = "ascii85", sentinel = "dc85 ", line_terminator = "\r", column_width = 100 }
//!
//! [sound]
//! offset = 256
//! blocks = 16
//!
//! [rom_checksum]
//! offset = 12400
//! pad_byte = 0
//! padded_len = 16380
//! repr = "hex_text"
//!
//! [file_checksum]
//! stored_at = { from_end = 9 }
//! covers_until = { from_end = 14 }
//! repr = "hex_text"
//! ```

use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PatchError;

/// Profile used when none is named.
pub const DEFAULT_PROFILE: &str = IMAC_ORIGINAL;

/// Tray-loading iMac, "iMac Firmware 3.0" update.
pub const IMAC_ORIGINAL: &str = "imac-original";

/// Slot-loading iMac firmware update.
pub const IMAC_SLOT_LOADING: &str = "imac-slot-loading";

/// Chime blocks in both iMac boot ROMs.
pub const IMAC_SOUND_BLOCKS: usize = 1722;

/// Largest profile file accepted.
pub const MAX_PROFILE_BYTES: u64 = 1024 * 1024;

/// How a 32-bit checksum is stored in the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumRepr {
    /// Eight upper-case ASCII hex digits.
    HexText,
    /// Four raw bytes, most significant first.
    BigEndian,
}

impl ChecksumRepr {
    /// Bytes the field occupies.
    pub const fn width(self) -> usize {
        match self {
            Self::HexText => 8,
            Self::BigEndian => 4,
        }
    }

    pub fn encode(self, value: u32) -> Vec<u8> {
        match self {
            Self::HexText => hex::encode_upper(value.to_be_bytes()).into_bytes(),
            Self::BigEndian => value.to_be_bytes().to_vec(),
        }
    }

    /// Parse a stored field. Hex text is accepted in either case.
    pub fn decode(self, stored: &[u8]) -> Option<u32> {
        match self {
            Self::HexText => {
                let mut bytes = [0u8; 4];
                hex::decode_to_slice(stored, &mut bytes).ok()?;
                Some(u32::from_be_bytes(bytes))
            }
            Self::BigEndian => Some(u32::from_be_bytes(stored.try_into().ok()?)),
        }
    }
}

/// A position in the firmware file.
///
/// Counting from the end keeps a field in place when re-encoding changes the
/// length of everything before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    FromStart(usize),
    FromEnd(usize),
}

impl Placement {
    /// Absolute offset in a file of `len` bytes, if it lies within it.
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Self::FromStart(offset) => (offset <= len).then_some(offset),
            Self::FromEnd(back) => len.checked_sub(back),
        }
    }

    /// Shortest file this placement resolves in.
    pub fn min_file_len(self) -> usize {
        match self {
            Self::FromStart(offset) => offset,
            Self::FromEnd(back) => back,
        }
    }
}

/// How the ROM image is embedded in the firmware file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RomEncoding {
    /// Open Firmware script lines: `sentinel`, Ascii85 payload, terminator.
    Ascii85 {
        sentinel: String,
        line_terminator: char,
        /// Maximum Ascii85 characters per line, excluding sentinel and terminator.
        column_width: usize,
    },
    /// Stored verbatim.
    Raw,
}

/// Where the ROM image sits in the firmware file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomRegion {
    pub offset: usize,
    /// Bytes of the firmware file spanned by the region (encoded length).
    pub len: usize,
    pub encoding: RomEncoding,
}

impl RomRegion {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Where the chime sits inside the decoded ROM image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSlot {
    pub offset: usize,
    /// Number of 34-byte IMA blocks.
    pub blocks: usize,
}

impl SoundSlot {
    pub fn max_samples(&self) -> usize {
        self.blocks * chime_ima::SAMPLES_PER_BLOCK
    }

    /// Largest accepted PCM input in bytes.
    pub fn max_pcm_len(&self) -> usize {
        self.max_samples() * chime_ima::BYTES_PER_SAMPLE
    }

    pub fn compressed_len(&self) -> usize {
        self.blocks * chime_ima::BYTES_PER_BLOCK
    }

    pub fn end(&self) -> usize {
        self.offset + self.compressed_len()
    }
}

/// Checksum over the ROM image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomChecksum {
    /// Absolute offset of the stored field in the original firmware file.
    pub offset: usize,
    /// Byte the image is padded with before checksumming.
    pub pad_byte: u8,
    /// Length the image is padded to.
    pub padded_len: usize,
    pub repr: ChecksumRepr,
}

/// Checksum over the whole firmware file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    /// Start of the stored field.
    pub stored_at: Placement,
    /// The checksum covers bytes `0..covers_until`.
    pub covers_until: Placement,
    pub repr: ChecksumRepr,
}

/// Layout of one firmware update file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// MD5 of the unmodified firmware file, lower-case hex.
    pub reference_md5: String,
    pub rom: RomRegion,
    pub sound: SoundSlot,
    pub rom_checksum: RomChecksum,
    pub file_checksum: FileChecksum,
}

impl FirmwareProfile {
    /// "iMac Firmware 3.0" for the tray-loading iMac.
    ///
    /// The boot ROM is embedded as Ascii85 lines (`dc85 ...`) in an Open
    /// Firmware script, so its encoded length can change when patched. Both
    /// checksums are written as hex text; the file checksum sits in a comment
    /// near the end of the script.
    pub fn imac_original() -> Self {
        const ROM_IMAGE_OFFSET: usize = 0x70192;
        const ROM_IMAGE_END_OFFSET: usize = 0xDCC6F;

        Self {
            name: IMAC_ORIGINAL.to_string(),
            description: "iMac Firmware 3.0 (tray-loading iMac)".to_string(),
            reference_md5: "702c51c05f59fb751e5dcfb5b194fba3".to_string(),
            rom: RomRegion {
                offset: ROM_IMAGE_OFFSET,
                len: ROM_IMAGE_END_OFFSET - ROM_IMAGE_OFFSET,
                encoding: RomEncoding::Ascii85 {
                    sentinel: "dc85 ".to_string(),
                    line_terminator: '\r',
                    column_width: 100,
                },
            },
            sound: SoundSlot {
                offset: 0x43C50,
                blocks: IMAC_SOUND_BLOCKS,
            },
            rom_checksum: RomChecksum {
                offset: 0xDCCCD,
                pad_byte: 0x00,
                padded_len: 0x7FFFC,
                repr: ChecksumRepr::HexText,
            },
            file_checksum: FileChecksum {
                stored_at: Placement::FromEnd(9),
                covers_until: Placement::FromEnd(14),
                repr: ChecksumRepr::HexText,
            },
        }
    }

    /// Firmware update for the slot-loading iMac.
    ///
    /// The boot ROM ("sboot" section) is stored raw; the flash part holds
    /// 512 KiB with its own checksum in the last 4 bytes, so the image is
    /// checksummed as if padded with erased flash (`0xFF`) up to that point.
    pub fn imac_slot_loading() -> Self {
        const SBOOT_POTENTIAL_SIZE: usize = 0x80000;

        Self {
            name: IMAC_SLOT_LOADING.to_string(),
            description: "iMac Firmware (slot-loading iMac)".to_string(),
            reference_md5: "9df1737e52474ca77d682603a66b3c91".to_string(),
            rom: RomRegion {
                offset: 0x6E07C,
                len: 0x72280,
                encoding: RomEncoding::Raw,
            },
            // The firmware's own table points 16 bytes earlier, at the sound header
            sound: SoundSlot {
                offset: 0x63DB0,
                blocks: IMAC_SOUND_BLOCKS,
            },
            rom_checksum: RomChecksum {
                offset: 0x6890,
                pad_byte: 0xFF,
                padded_len: SBOOT_POTENTIAL_SIZE - 4,
                repr: ChecksumRepr::BigEndian,
            },
            // The raw image keeps its length, so this is also a fixed offset
            file_checksum: FileChecksum {
                stored_at: Placement::FromEnd(4),
                covers_until: Placement::FromEnd(4),
                repr: ChecksumRepr::BigEndian,
            },
        }
    }

    /// Parse a profile from TOML and validate it.
    pub fn from_toml(text: &str) -> Result<Self, PatchError> {
        let profile: Self = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the internal consistency of the layout.
    ///
    /// Whether the layout fits a particular firmware file is checked while
    /// patching.
    pub fn validate(&self) -> Result<(), PatchError> {
        let invalid = |reason: String| PatchError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };

        if self.reference_md5.len() != 32
            || !self.reference_md5.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(invalid(format!(
                "reference_md5 must be 32 lower-case hex digits, got {:?}",
                self.reference_md5
            )));
        }
        if self.rom.len == 0 {
            return Err(invalid("ROM region is empty".to_string()));
        }
        if self.rom.offset.checked_add(self.rom.len).is_none() {
            return Err(invalid(format!(
                "ROM region {:#x} + {:#x} is out of range",
                self.rom.offset, self.rom.len
            )));
        }
        if self.sound.blocks == 0 {
            return Err(invalid("sound slot has no blocks".to_string()));
        }
        // PCM is the largest per-block size, so this bounds the compressed slot too
        let pcm_block = chime_ima::SAMPLES_PER_BLOCK * chime_ima::BYTES_PER_SAMPLE;
        if self
            .sound
            .blocks
            .checked_mul(pcm_block)
            .and_then(|_| self.sound.offset.checked_add(self.sound.compressed_len()))
            .is_none()
        {
            return Err(invalid(format!(
                "sound slot of {} blocks at {:#x} is out of range",
                self.sound.blocks, self.sound.offset
            )));
        }
        if self.sound.end() > self.rom_checksum.padded_len {
            return Err(invalid(format!(
                "sound slot ends at {:#x}, past the checksummed length {:#x}",
                self.sound.end(),
                self.rom_checksum.padded_len
            )));
        }
        let field_start = self.rom_checksum.offset;
        let Some(field_end) = field_start.checked_add(self.rom_checksum.repr.width()) else {
            return Err(invalid(format!(
                "ROM checksum offset {:#x} is out of range",
                field_start
            )));
        };
        if field_start < self.rom.end() && self.rom.offset < field_end {
            return Err(invalid(format!(
                "ROM checksum field {:#x}..{:#x} overlaps the ROM region",
                field_start, field_end
            )));
        }
        let file = &self.file_checksum;
        let covers_field = match (file.covers_until, file.stored_at) {
            (Placement::FromEnd(covers), Placement::FromEnd(stored)) => covers < stored,
            (Placement::FromStart(covers), Placement::FromStart(stored)) => covers > stored,
            // Checked against the file length when patching
            _ => false,
        };
        if covers_field {
            return Err(invalid(format!(
                "file checksum coverage {:?} reaches into its own field at {:?}",
                file.covers_until, file.stored_at
            )));
        }
        if let RomEncoding::Ascii85 {
            sentinel,
            line_terminator,
            column_width,
        } = &self.rom.encoding
        {
            if sentinel.is_empty() {
                return Err(invalid("Ascii85 sentinel is empty".to_string()));
            }
            if !line_terminator.is_ascii() {
                return Err(invalid(format!(
                    "line terminator {:?} is not ASCII",
                    line_terminator
                )));
            }
            if *column_width < crate::ascii85::GROUP_CHARS {
                return Err(invalid(format!(
                    "column width {} cannot hold a 5-character group",
                    column_width
                )));
            }
        }
        Ok(())
    }
}

/// All profiles compiled into the tool.
pub fn builtin_profiles() -> Vec<FirmwareProfile> {
    vec![
        FirmwareProfile::imac_original(),
        FirmwareProfile::imac_slot_loading(),
    ]
}

/// Look up a built-in profile by name.
pub fn builtin_profile(name: &str) -> Result<FirmwareProfile, PatchError> {
    builtin_profiles()
        .into_iter()
        .find(|profile| profile.name == name)
        .ok_or_else(|| PatchError::UnknownProfile(name.to_string()))
}

/// Load and validate a profile file.
pub fn load_profile(path: &Path) -> Result<FirmwareProfile, PatchError> {
    let bytes = crate::fs::read_file_with_limit(path, MAX_PROFILE_BYTES)?;
    let text = String::from_utf8(bytes).map_err(|err| PatchError::UnreadableInput {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
    })?;
    FirmwareProfile::from_toml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_are_valid() {
        for profile in builtin_profiles() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_imac_original_geometry() {
        let profile = builtin_profile(IMAC_ORIGINAL).unwrap();
        assert_eq!(profile.rom.offset, 0x70192);
        assert_eq!(profile.rom.end(), 0xDCC6F);
        assert_eq!(profile.sound.max_samples(), 110_208);
        assert_eq!(profile.sound.max_pcm_len(), 220_416);
        assert_eq!(profile.sound.compressed_len(), 58_548);
        assert!(matches!(profile.rom.encoding, RomEncoding::Ascii85 { .. }));
    }

    #[test]
    fn test_imac_slot_loading_geometry() {
        let profile = builtin_profile(IMAC_SLOT_LOADING).unwrap();
        assert_eq!(profile.rom.end(), 0x6E07C + 0x72280);
        assert_eq!(profile.rom_checksum.padded_len, 0x7FFFC);
        assert_eq!(profile.rom_checksum.pad_byte, 0xFF);
        assert_eq!(profile.rom.encoding, RomEncoding::Raw);
        // Chime ends inside the used part of the sboot section
        assert!(profile.sound.end() <= profile.rom.len);
    }

    #[test]
    fn test_unknown_profile() {
        assert!(matches!(
            builtin_profile("power-mac"),
            Err(PatchError::UnknownProfile(name)) if name == "power-mac"
        ));
    }

    #[test]
    fn test_checksum_repr_hex_text() {
        let repr = ChecksumRepr::HexText;
        assert_eq!(repr.encode(0x11E6_0398), b"11E60398");
        assert_eq!(repr.encode(1), b"00000001");
        assert_eq!(repr.decode(b"11e60398"), Some(0x11E6_0398));
        assert_eq!(repr.decode(b"11E6039"), None);
        assert_eq!(repr.decode(b"11E6039G"), None);
    }

    #[test]
    fn test_checksum_repr_big_endian() {
        let repr = ChecksumRepr::BigEndian;
        assert_eq!(repr.encode(0x11E6_0398), vec![0x11, 0xE6, 0x03, 0x98]);
        assert_eq!(repr.decode(&[0x11, 0xE6, 0x03, 0x98]), Some(0x11E6_0398));
        assert_eq!(repr.decode(&[0x11, 0xE6, 0x03]), None);
    }

    #[test]
    fn test_placement_resolve() {
        assert_eq!(Placement::FromStart(10).resolve(100), Some(10));
        assert_eq!(Placement::FromStart(101).resolve(100), None);
        assert_eq!(Placement::FromEnd(9).resolve(100), Some(91));
        assert_eq!(Placement::FromEnd(101).resolve(100), None);
    }

    const VARIANT_TOML: &str = r#"
name = "test-variant"
reference_md5 = "00112233445566778899aabbccddeeff"

[rom]
offset = 4096
len = 8192
encoding = { kind = "ascii85", sentinel = "dc85 ", line_terminator = "\r", column_width = 100 }

[sound]
offset = 256
blocks = 16

[rom_checksum]
offset = 12400
pad_byte = 0
padded_len = 16380
repr = "hex_text"

[file_checksum]
stored_at = { from_end = 9 }
covers_until = { from_end = 14 }
repr = "hex_text"
"#;

    #[test]
    fn test_profile_from_toml() {
        let profile = FirmwareProfile::from_toml(VARIANT_TOML).unwrap();
        assert_eq!(profile.name, "test-variant");
        assert_eq!(profile.description, "");
        assert_eq!(
            profile.rom.encoding,
            RomEncoding::Ascii85 {
                sentinel: "dc85 ".to_string(),
                line_terminator: '\r',
                column_width: 100,
            }
        );
        assert_eq!(profile.file_checksum.stored_at, Placement::FromEnd(9));
        assert_eq!(profile.rom_checksum.repr, ChecksumRepr::HexText);
    }

    #[test]
    fn test_profile_toml_roundtrip_of_builtin() {
        let profile = FirmwareProfile::imac_slot_loading();
        let text = toml::to_string(&profile).unwrap();
        assert_eq!(FirmwareProfile::from_toml(&text).unwrap(), profile);
    }

    #[test]
    fn test_profile_rejects_bad_layout() {
        let mut profile = FirmwareProfile::imac_original();
        profile.sound.offset = profile.rom_checksum.padded_len;
        assert!(matches!(
            profile.validate(),
            Err(PatchError::InvalidProfile { .. })
        ));

        let mut profile = FirmwareProfile::imac_original();
        profile.reference_md5 = "702C51C05F59FB751E5DCFB5B194FBA3".to_string();
        assert!(profile.validate().is_err());

        let mut profile = FirmwareProfile::imac_slot_loading();
        profile.rom_checksum.offset = profile.rom.offset + 0x100;
        assert!(profile.validate().is_err());

        let mut profile = FirmwareProfile::imac_original();
        profile.rom.encoding = RomEncoding::Ascii85 {
            sentinel: "dc85 ".to_string(),
            line_terminator: '\r',
            column_width: 4,
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_rejects_checksum_covering_its_field() {
        let mut profile = FirmwareProfile::imac_slot_loading();
        profile.file_checksum.covers_until = Placement::FromEnd(0);
        assert!(matches!(
            profile.validate(),
            Err(PatchError::InvalidProfile { .. })
        ));

        profile.file_checksum.stored_at = Placement::FromStart(100);
        profile.file_checksum.covers_until = Placement::FromStart(104);
        assert!(profile.validate().is_err());

        profile.file_checksum.covers_until = Placement::FromStart(100);
        profile.validate().unwrap();
    }

    #[test]
    fn test_profile_rejects_out_of_range_sizes() {
        let text = VARIANT_TOML.replace(
            "offset = 256\nblocks = 16",
            "offset = 9223372036854775807\nblocks = 9223372036854775807",
        );
        assert_ne!(text, VARIANT_TOML);
        let err = FirmwareProfile::from_toml(&text).unwrap_err();
        assert!(matches!(err, PatchError::InvalidProfile { .. }), "{err}");

        let mut profile = FirmwareProfile::imac_slot_loading();
        profile.sound.blocks = usize::MAX / 64;
        assert!(profile.validate().is_err());

        let mut profile = FirmwareProfile::imac_original();
        profile.rom.offset = usize::MAX - 1;
        assert!(profile.validate().is_err());

        let mut profile = FirmwareProfile::imac_original();
        profile.rom_checksum.offset = usize::MAX - 2;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_syntax_error() {
        assert!(matches!(
            FirmwareProfile::from_toml("name = "),
            Err(PatchError::ProfileSyntax(_))
        ));
    }
}
