//! ROM region extraction and re-embedding, and checksum field access.

use std::ops::Range;

use crate::PatchError;
use crate::ascii85::{self, Ascii85Error};
use crate::checksum::Adler32;
use crate::profile::{ChecksumRepr, FirmwareProfile, RomChecksum, RomEncoding};

/// Pull the decoded ROM image out of an unmodified firmware file.
///
/// For Ascii85 regions every `sentinel ... terminator` line inside the region
/// is decoded and the payloads are concatenated; scanning stops at the end
/// of the region or when no further complete line is found. A line with an
/// empty payload is an error.
pub fn extract_rom(firmware: &[u8], profile: &FirmwareProfile) -> Result<Vec<u8>, PatchError> {
    let region = &profile.rom;
    if firmware.len() < region.end() {
        return Err(PatchError::RegionTooShort {
            what: "ROM region",
            needed: region.end(),
            actual: firmware.len(),
        });
    }

    let rom = match &region.encoding {
        RomEncoding::Raw => firmware[region.offset..region.end()].to_vec(),
        RomEncoding::Ascii85 {
            sentinel,
            line_terminator,
            ..
        } => {
            let lines = LineScan {
                sentinel: sentinel.as_bytes(),
                terminator: *line_terminator as u8,
                contiguous: false,
            };
            lines.decode(&firmware[..region.end()], region.offset)?.0
        }
    };

    check_rom_len(&rom, profile)?;
    tracing::debug!(
        "Extracted {} byte ROM image from {:#x}..{:#x}",
        rom.len(),
        region.offset,
        region.end()
    );
    Ok(rom)
}

/// A ROM image found in a possibly patched firmware file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRom {
    pub rom: Vec<u8>,
    /// Bytes of the file holding the encoded image.
    pub encoded: Range<usize>,
}

impl LocatedRom {
    /// Where a field recorded at `offset` in the unmodified file sits now.
    ///
    /// Fields after the region move with it when re-encoding changed its length.
    pub fn shifted(&self, offset: usize, profile: &FirmwareProfile) -> Option<usize> {
        if offset < profile.rom.end() {
            return Some(offset);
        }
        let shift = self.encoded.end as isize - profile.rom.end() as isize;
        offset.checked_add_signed(shift)
    }
}

/// Find the ROM image in a firmware file that may already have been patched.
///
/// Ascii85 regions are taken to be the run of back-to-back lines starting at
/// the region offset, which is how [`embed_rom`] writes them. The run may end
/// before or after the profile's region end.
pub fn locate_rom(firmware: &[u8], profile: &FirmwareProfile) -> Result<LocatedRom, PatchError> {
    let region = &profile.rom;
    let located = match &region.encoding {
        RomEncoding::Raw => LocatedRom {
            rom: extract_rom(firmware, profile)?,
            encoded: region.range(),
        },
        RomEncoding::Ascii85 {
            sentinel,
            line_terminator,
            ..
        } => {
            if firmware.len() < region.offset {
                return Err(PatchError::RegionTooShort {
                    what: "ROM region",
                    needed: region.offset,
                    actual: firmware.len(),
                });
            }
            let lines = LineScan {
                sentinel: sentinel.as_bytes(),
                terminator: *line_terminator as u8,
                contiguous: true,
            };
            let (rom, end) = lines.decode(firmware, region.offset)?;
            check_rom_len(&rom, profile)?;
            LocatedRom {
                rom,
                encoded: region.offset..end,
            }
        }
    };
    Ok(located)
}

fn check_rom_len(rom: &[u8], profile: &FirmwareProfile) -> Result<(), PatchError> {
    let needed = profile.sound.end();
    if rom.len() < needed {
        return Err(PatchError::RegionTooShort {
            what: "sound slot in ROM image",
            needed,
            actual: rom.len(),
        });
    }
    if rom.len() > profile.rom_checksum.padded_len {
        return Err(PatchError::RegionTooLong {
            len: rom.len(),
            max: profile.rom_checksum.padded_len,
        });
    }
    Ok(())
}

struct LineScan<'a> {
    sentinel: &'a [u8],
    terminator: u8,
    /// Stop at the first gap instead of searching for the next sentinel.
    contiguous: bool,
}

impl LineScan<'_> {
    /// Decode lines in `text` from `start`; returns the payloads and the end
    /// of the last line read.
    fn decode(&self, text: &[u8], start: usize) -> Result<(Vec<u8>, usize), PatchError> {
        let mut rom = Vec::new();
        let mut lines = 0usize;
        let mut pos = start;
        let mut end = start;

        while pos < text.len() {
            let Some(found) = find(&text[pos..], self.sentinel) else {
                break;
            };
            if self.contiguous && lines > 0 && found != 0 {
                break;
            }
            let payload_start = pos + found + self.sentinel.len();
            let Some(payload_len) = text[payload_start..]
                .iter()
                .position(|&b| b == self.terminator)
            else {
                break;
            };

            let payload = &text[payload_start..payload_start + payload_len];
            let decoded = if payload.is_empty() {
                Err(Ascii85Error::EmptyLine)
            } else {
                ascii85::decode(payload)
            }
            .map_err(|source| PatchError::TextCodecDecodeError {
                offset: payload_start,
                source,
            })?;
            rom.extend_from_slice(&decoded);
            lines += 1;

            pos = payload_start + payload_len + 1;
            end = pos;
        }

        tracing::debug!("Decoded {} Ascii85 lines", lines);
        Ok((rom, end))
    }
}

/// Put a (modified) ROM image back in place of the bytes at `encoded`.
///
/// `encoded` is where the image currently sits: the profile's region for an
/// unmodified file, or [`LocatedRom::encoded`]. Ascii85 images are re-encoded
/// line by line and may come out longer or shorter than before, shifting
/// everything after them. Raw images must keep their length.
pub fn embed_rom(
    firmware: &mut Vec<u8>,
    rom: &[u8],
    encoded: Range<usize>,
    profile: &FirmwareProfile,
) -> Result<(), PatchError> {
    if firmware.len() < encoded.end {
        return Err(PatchError::RegionTooShort {
            what: "ROM region",
            needed: encoded.end,
            actual: firmware.len(),
        });
    }

    match &profile.rom.encoding {
        RomEncoding::Raw => {
            if rom.len() != encoded.len() {
                return Err(PatchError::RegionTooShort {
                    what: "raw ROM image",
                    needed: encoded.len(),
                    actual: rom.len(),
                });
            }
            firmware[encoded].copy_from_slice(rom);
        }
        RomEncoding::Ascii85 {
            sentinel,
            line_terminator,
            column_width,
        } => {
            let text = ascii85::encode_lines(
                rom,
                sentinel.as_bytes(),
                *line_terminator as u8,
                *column_width,
            );
            tracing::debug!(
                "Re-encoded ROM image: {} bytes of text (was {})",
                text.len(),
                encoded.len()
            );
            firmware.splice(encoded, text);
        }
    }
    Ok(())
}

/// Checksum of the ROM image as if padded with the pad byte to the padded length.
pub fn rom_checksum(rom: &[u8], spec: &RomChecksum) -> Result<u32, PatchError> {
    let pad = spec
        .padded_len
        .checked_sub(rom.len())
        .ok_or(PatchError::RegionTooLong {
            len: rom.len(),
            max: spec.padded_len,
        })?;

    let mut adler = Adler32::new();
    adler.update(rom);
    adler.update_repeated(spec.pad_byte, pad);
    Ok(adler.finish())
}

/// Store a checksum field at `offset`.
pub fn write_checksum(
    firmware: &mut [u8],
    offset: usize,
    value: u32,
    repr: ChecksumRepr,
) -> Result<(), PatchError> {
    let field = repr.encode(value);
    if field.len() != repr.width() {
        return Err(PatchError::ChecksumWidthMismatch {
            expected: repr.width(),
            actual: field.len(),
        });
    }

    let end = offset + field.len();
    if end > firmware.len() {
        return Err(PatchError::RegionTooShort {
            what: "checksum field",
            needed: end,
            actual: firmware.len(),
        });
    }
    firmware[offset..end].copy_from_slice(&field);
    Ok(())
}

/// Read a checksum field at `offset`.
pub fn read_checksum(
    firmware: &[u8],
    offset: usize,
    repr: ChecksumRepr,
) -> Result<u32, PatchError> {
    let end = offset + repr.width();
    let Some(stored) = firmware.get(offset..end) else {
        return Err(PatchError::RegionTooShort {
            what: "checksum field",
            needed: end,
            actual: firmware.len(),
        });
    };

    repr.decode(stored)
        .ok_or_else(|| PatchError::MalformedStoredChecksum {
            offset,
            stored: String::from_utf8_lossy(stored).into_owned(),
        })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
