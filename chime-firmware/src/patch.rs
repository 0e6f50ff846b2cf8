//! The patch pipeline: verify, extract, compress, splice, re-checksum, re-embed.
//!
//! Each stage is a plain function from the previous stage's value to the
//! next, so the order in which bytes are observed is explicit:
//!
//! 1. the reference digest is checked before anything is touched
//! 2. the ROM checksum is computed only after the chime is spliced in
//! 3. the file checksum is computed only after the ROM is re-embedded, since
//!    re-embedding can change the file length

use crate::profile::{FileChecksum, FirmwareProfile, Placement, SoundSlot};
use crate::region::{
    LocatedRom, embed_rom, extract_rom, locate_rom, read_checksum, rom_checksum, write_checksum,
};
use crate::{PatchError, checksum};

/// Knobs for [`patch_firmware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Refuse any firmware whose MD5 differs from the profile's reference.
    ///
    /// Turning this off allows re-patching an already patched file. The
    /// result is only as sound as the input: nothing else checks that the
    /// file really has the profile's layout.
    pub verify_reference: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            verify_reference: true,
        }
    }
}

/// A fully patched, internally consistent firmware image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedFirmware {
    pub bytes: Vec<u8>,
    /// Value stored in the ROM checksum field.
    pub rom_checksum: u32,
    /// Value stored in the file checksum field.
    pub file_checksum: u32,
}

/// MD5 of `bytes` as lower-case hex.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(md5::compute(bytes).0)
}

/// Fail unless `firmware` is the profile's unmodified reference file.
pub fn verify_reference(firmware: &[u8], profile: &FirmwareProfile) -> Result<(), PatchError> {
    let actual = content_digest(firmware);
    if actual != profile.reference_md5 {
        return Err(PatchError::HashMismatch {
            profile: profile.name.clone(),
            expected: profile.reference_md5.clone(),
            actual,
        });
    }
    Ok(())
}

/// Validate raw 16-bit big-endian PCM and pad it with silence to the slot size.
pub fn normalize_sound(sound: &[u8], slot: &SoundSlot) -> Result<Vec<u8>, PatchError> {
    let max = slot.max_pcm_len();
    if sound.len() > max {
        return Err(PatchError::SoundTooLong {
            len: sound.len(),
            max,
        });
    }
    if sound.len() % chime_ima::BYTES_PER_SAMPLE != 0 {
        return Err(PatchError::SoundMisaligned { len: sound.len() });
    }

    let mut pcm = sound.to_vec();
    if pcm.len() < max {
        tracing::debug!(
            "Padding sound with {} samples of silence",
            (max - pcm.len()) / chime_ima::BYTES_PER_SAMPLE
        );
        pcm.resize(max, 0);
    }
    Ok(pcm)
}

/// IMA-encode normalized PCM for the slot.
pub fn compress_sound(pcm: &[u8], slot: &SoundSlot) -> Result<Vec<u8>, PatchError> {
    let compressed = chime_ima::encode_ima(&chime_ima::samples_from_be_bytes(pcm));
    if compressed.len() != slot.compressed_len() {
        return Err(PatchError::CompressedLengthMismatch {
            expected: slot.compressed_len(),
            actual: compressed.len(),
        });
    }
    Ok(compressed)
}

/// Overwrite the chime inside the ROM image. Lengths never change.
pub fn splice_sound(rom: &mut [u8], compressed: &[u8], slot: &SoundSlot) -> Result<(), PatchError> {
    let end = slot.offset + compressed.len();
    let Some(target) = rom.get_mut(slot.offset..end) else {
        return Err(PatchError::RegionTooShort {
            what: "sound slot in ROM image",
            needed: end,
            actual: rom.len(),
        });
    };
    target.copy_from_slice(compressed);
    Ok(())
}

/// Byte range covered by the file checksum and offset of its field.
pub(crate) fn file_checksum_layout(
    firmware: &[u8],
    spec: &FileChecksum,
) -> Result<(usize, usize), PatchError> {
    let len = firmware.len();
    let resolve = |placement: Placement, what: &'static str| {
        placement
            .resolve(len)
            .ok_or_else(|| PatchError::RegionTooShort {
                what,
                needed: placement.min_file_len(),
                actual: len,
            })
    };
    let covered = resolve(spec.covers_until, "file checksum coverage")?;
    let stored_at = resolve(spec.stored_at, "file checksum field")?;
    if covered > stored_at {
        return Err(PatchError::ChecksumCoversField {
            covered,
            field: stored_at,
        });
    }
    Ok((covered, stored_at))
}

/// Recompute and store the whole-file checksum.
pub fn store_file_checksum(firmware: &mut [u8], spec: &FileChecksum) -> Result<u32, PatchError> {
    let (covered, stored_at) = file_checksum_layout(firmware, spec)?;
    let value = checksum::adler32_prefix(firmware, covered);
    write_checksum(firmware, stored_at, value, spec.repr)?;
    Ok(value)
}

/// Replace the startup chime in `firmware` with `sound`.
///
/// `sound` is raw mono 16-bit big-endian PCM, at most
/// `profile.sound.max_pcm_len()` bytes; shorter sounds are padded with
/// silence. Either the complete patched image is returned or nothing is.
pub fn patch_firmware(
    firmware: Vec<u8>,
    sound: &[u8],
    profile: &FirmwareProfile,
    options: &PatchOptions,
) -> Result<PatchedFirmware, PatchError> {
    profile.validate()?;
    let mut firmware = firmware;

    if options.verify_reference {
        verify_reference(&firmware, profile)?;
        tracing::info!("Firmware matches reference image for {}", profile.name);
    } else {
        tracing::warn!(
            "Skipping reference check for {}; the result is only valid if the input has this layout",
            profile.name
        );
    }

    // A verified reference file is read strictly within the profile's region.
    // Anything else may have been re-encoded already and is located instead.
    let located = if options.verify_reference {
        LocatedRom {
            rom: extract_rom(&firmware, profile)?,
            encoded: profile.rom.range(),
        }
    } else {
        locate_rom(&firmware, profile)?
    };
    tracing::info!(
        "Extracted {} byte ROM image from {:#x}..{:#x}",
        located.rom.len(),
        located.encoded.start,
        located.encoded.end
    );

    let pcm = normalize_sound(sound, &profile.sound)?;
    let compressed = compress_sound(&pcm, &profile.sound)?;
    tracing::info!(
        "Compressed {} samples to {} bytes of IMA 4:1",
        profile.sound.max_samples(),
        compressed.len()
    );

    let rom_field = located
        .shifted(profile.rom_checksum.offset, profile)
        .ok_or(PatchError::RegionTooShort {
            what: "ROM checksum field",
            needed: profile.rom_checksum.offset,
            actual: firmware.len(),
        })?;
    let LocatedRom { mut rom, encoded } = located;
    splice_sound(&mut rom, &compressed, &profile.sound)?;

    let rom_value = rom_checksum(&rom, &profile.rom_checksum)?;
    let previous = read_checksum(&firmware, rom_field, profile.rom_checksum.repr).ok();
    write_checksum(&mut firmware, rom_field, rom_value, profile.rom_checksum.repr)?;
    match previous {
        Some(previous) => tracing::info!("ROM checksum {:08X} -> {:08X}", previous, rom_value),
        None => tracing::info!("ROM checksum {:08X}", rom_value),
    }

    let original_len = firmware.len();
    embed_rom(&mut firmware, &rom, encoded, profile)?;
    if firmware.len() != original_len {
        tracing::info!(
            "Firmware length changed from {} to {} bytes",
            original_len,
            firmware.len()
        );
    }

    let file_value = store_file_checksum(&mut firmware, &profile.file_checksum)?;
    tracing::info!("File checksum {:08X}", file_value);

    Ok(PatchedFirmware {
        bytes: firmware,
        rom_checksum: rom_value,
        file_checksum: file_value,
    })
}
