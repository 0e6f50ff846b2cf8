//! Inject command - patch a firmware file with a new chime

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use chime_firmware::fs::{MAX_FIRMWARE_BYTES, MAX_SOUND_BYTES, read_file_with_limit, write_file};
use chime_firmware::{PatchOptions, patch_firmware};

use crate::profile_select::ProfileArgs;

/// Arguments for the inject command
#[derive(Args)]
pub struct InjectArgs {
    /// Original firmware update file
    pub firmware: PathBuf,

    /// Raw 16-bit big-endian PCM sound
    pub sound: PathBuf,

    /// Where to write the patched firmware
    pub output: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Patch even if the firmware is not the profile's original file
    #[arg(long)]
    pub skip_reference_check: bool,
}

/// Execute the inject command
pub fn execute(args: InjectArgs) -> Result<()> {
    let profile = args.profile.load()?;

    let firmware = read_file_with_limit(&args.firmware, MAX_FIRMWARE_BYTES)?;
    let sound = read_file_with_limit(&args.sound, MAX_SOUND_BYTES)?;
    tracing::info!(
        "Injecting {:?} ({} bytes) into {:?} ({} bytes)",
        args.sound,
        sound.len(),
        args.firmware,
        firmware.len()
    );

    let options = PatchOptions {
        verify_reference: !args.skip_reference_check,
    };
    let patched = patch_firmware(firmware, &sound, &profile, &options)
        .with_context(|| format!("Failed to patch {}", args.firmware.display()))?;

    write_file(&args.output, &patched.bytes)?;

    println!(
        "Created: {} ({} bytes)",
        args.output.display(),
        patched.bytes.len()
    );
    println!("  ROM checksum:  {:08X}", patched.rom_checksum);
    println!("  File checksum: {:08X}", patched.file_checksum);
    Ok(())
}
