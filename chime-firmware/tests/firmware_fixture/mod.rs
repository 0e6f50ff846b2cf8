//! Small synthetic firmware files for pipeline tests.
//!
//! Both fixtures carry correct checksums, so an unpatched fixture verifies
//! cleanly and matches its own reference digest.

use chime_firmware::ascii85;
use chime_firmware::checksum::adler32;
use chime_firmware::content_digest;
use chime_firmware::profile::{
    ChecksumRepr, FileChecksum, FirmwareProfile, Placement, RomChecksum, RomEncoding, RomRegion,
    SoundSlot,
};

/// Decoded ROM image length.
pub const ROM_LEN: usize = 128;
/// Length the ROM image is checksummed at.
pub const PADDED_LEN: usize = 256;
/// Chime offset inside the ROM image.
pub const SOUND_OFFSET: usize = 16;
/// Chime blocks; 128 samples fit.
pub const SOUND_BLOCKS: usize = 2;
/// Ascii85 characters per line in the text fixture.
pub const TEXT_WIDTH: usize = 20;

const SENTINEL: &str = "dc85 ";

pub struct Fixture {
    pub firmware: Vec<u8>,
    pub rom: Vec<u8>,
    pub profile: FirmwareProfile,
}

pub fn rom_image() -> Vec<u8> {
    (0..ROM_LEN).map(|i| (i * 37 % 251) as u8).collect()
}

/// `samples` of a sine wave as big-endian PCM.
pub fn sound(samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| (((i as f32 * 0.3).sin() * 12000.0) as i16).to_be_bytes())
        .collect()
}

/// Adler-32 of `rom` padded by copying, independent of the engine's
/// incremental padding.
pub fn padded_rom_checksum(rom: &[u8], pad_byte: u8) -> u32 {
    let mut padded = rom.to_vec();
    padded.resize(PADDED_LEN, pad_byte);
    adler32(&padded)
}

/// Open Firmware script style: Ascii85 lines, hex-text checksums.
pub fn text_fixture() -> Fixture {
    let rom = rom_image();

    let mut firmware = b"\\ iMac firmware update\r".to_vec();
    let rom_offset = firmware.len();
    let region = ascii85::encode_lines(&rom, SENTINEL.as_bytes(), b'\r', TEXT_WIDTH);
    firmware.extend_from_slice(&region);
    firmware.extend_from_slice(b"\\ rom checksum ");
    let rom_checksum_offset = firmware.len();
    firmware.extend_from_slice(b"00000000\r\\ end of image\r\\ sum ");
    firmware.extend_from_slice(b"00000000\r");

    let value = padded_rom_checksum(&rom, 0x00);
    firmware[rom_checksum_offset..rom_checksum_offset + 8]
        .copy_from_slice(format!("{:08X}", value).as_bytes());
    let len = firmware.len();
    let value = adler32(&firmware[..len - 14]);
    firmware[len - 9..len - 1].copy_from_slice(format!("{:08X}", value).as_bytes());

    let profile = FirmwareProfile {
        name: "test-text".to_string(),
        description: "Ascii85 fixture".to_string(),
        reference_md5: content_digest(&firmware),
        rom: RomRegion {
            offset: rom_offset,
            len: region.len(),
            encoding: RomEncoding::Ascii85 {
                sentinel: SENTINEL.to_string(),
                line_terminator: '\r',
                column_width: TEXT_WIDTH,
            },
        },
        sound: SoundSlot {
            offset: SOUND_OFFSET,
            blocks: SOUND_BLOCKS,
        },
        rom_checksum: RomChecksum {
            offset: rom_checksum_offset,
            pad_byte: 0x00,
            padded_len: PADDED_LEN,
            repr: ChecksumRepr::HexText,
        },
        file_checksum: FileChecksum {
            stored_at: Placement::FromEnd(9),
            covers_until: Placement::FromEnd(14),
            repr: ChecksumRepr::HexText,
        },
    };

    Fixture {
        firmware,
        rom,
        profile,
    }
}

/// Raw ROM with big-endian checksums: one in a header table, one in the
/// last four bytes.
pub fn raw_fixture() -> Fixture {
    let rom = rom_image();

    let mut firmware = vec![0xAB; 32];
    firmware.extend_from_slice(&rom);
    firmware.extend_from_slice(&[0x5A; 16]);

    let value = padded_rom_checksum(&rom, 0xFF);
    firmware[8..12].copy_from_slice(&value.to_be_bytes());
    let len = firmware.len();
    let value = adler32(&firmware[..len - 4]);
    firmware[len - 4..].copy_from_slice(&value.to_be_bytes());

    let profile = FirmwareProfile {
        name: "test-raw".to_string(),
        description: String::new(),
        reference_md5: content_digest(&firmware),
        rom: RomRegion {
            offset: 32,
            len: ROM_LEN,
            encoding: RomEncoding::Raw,
        },
        sound: SoundSlot {
            offset: SOUND_OFFSET,
            blocks: SOUND_BLOCKS,
        },
        rom_checksum: RomChecksum {
            offset: 8,
            pad_byte: 0xFF,
            padded_len: PADDED_LEN,
            repr: ChecksumRepr::BigEndian,
        },
        file_checksum: FileChecksum {
            stored_at: Placement::FromEnd(4),
            covers_until: Placement::FromEnd(4),
            repr: ChecksumRepr::BigEndian,
        },
    };

    Fixture {
        firmware,
        rom,
        profile,
    }
}
