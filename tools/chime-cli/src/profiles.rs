//! Profiles command - list built-in firmware profiles

use chime_firmware::builtin_profiles;
use chime_firmware::profile::{DEFAULT_PROFILE, RomEncoding};

pub fn execute() {
    for profile in builtin_profiles() {
        let default = if profile.name == DEFAULT_PROFILE {
            " (default)"
        } else {
            ""
        };
        let encoding = match &profile.rom.encoding {
            RomEncoding::Ascii85 { .. } => "Ascii85 text",
            RomEncoding::Raw => "raw",
        };

        println!("{}{}", profile.name, default);
        println!("  {}", profile.description);
        println!("  Reference MD5: {}", profile.reference_md5);
        println!(
            "  ROM: {:#x}..{:#x} ({})",
            profile.rom.offset,
            profile.rom.end(),
            encoding
        );
        println!(
            "  Chime: {} blocks at ROM offset {:#x}, up to {} samples ({:.2}s)",
            profile.sound.blocks,
            profile.sound.offset,
            profile.sound.max_samples(),
            profile.sound.max_samples() as f64 / 44_100.0
        );
    }
}
