//! Verify command - check both checksums of a firmware file

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use chime_firmware::fs::{MAX_FIRMWARE_BYTES, read_file_with_limit};
use chime_firmware::verify_firmware;

use crate::profile_select::ProfileArgs;

/// Arguments for the verify command
#[derive(Args)]
pub struct VerifyArgs {
    /// Firmware update file, original or patched
    pub firmware: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Execute the verify command; fails if either checksum is stale
pub fn execute(args: VerifyArgs) -> Result<()> {
    let profile = args.profile.load()?;
    let firmware = read_file_with_limit(&args.firmware, MAX_FIRMWARE_BYTES)?;
    let report = verify_firmware(&firmware, &profile)?;

    println!("{} ({})", args.firmware.display(), report.profile);
    println!(
        "  Original image: {}",
        if report.reference_matches { "yes" } else { "no" }
    );
    println!("  ROM checksum:  {}", report.rom);
    println!("  File checksum: {}", report.file);

    if !report.is_valid() {
        anyhow::bail!("Checksum mismatch in {}", args.firmware.display());
    }
    Ok(())
}
